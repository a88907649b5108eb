//! Key formats and the candidates extracted for them.

use std::fmt;

/// The kinds of key material the scanners look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyFormat {
    /// Raw private key written as space-separated hex bytes
    HexKey,
    /// Native SegWit address (`bc1...`)
    Bech32Address,
    /// BIP-84 extended public key (`zpub...`)
    ExtendedPublicKey,
    /// Extended private key (`xprv...`)
    ExtendedPrivateKey,
    /// Wallet Import Format private key
    WifKey,
    /// BIP-39 mnemonic seed phrase
    MnemonicPhrase,
}

impl KeyFormat {
    /// All formats found by byte-pattern matching
    pub const BYTE_PATTERNS: [KeyFormat; 5] = [
        KeyFormat::HexKey,
        KeyFormat::Bech32Address,
        KeyFormat::ExtendedPublicKey,
        KeyFormat::ExtendedPrivateKey,
        KeyFormat::WifKey,
    ];

    /// Short label used in reports and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyFormat::HexKey => "hex",
            KeyFormat::Bech32Address => "bech32",
            KeyFormat::ExtendedPublicKey => "zpub",
            KeyFormat::ExtendedPrivateKey => "xprv",
            KeyFormat::WifKey => "wif",
            KeyFormat::MnemonicPhrase => "mnemonic",
        }
    }

    /// Formats without a checksum are accepted on shape alone, so garbage
    /// that happens to look right is reported too
    pub fn is_shape_only(&self) -> bool {
        !matches!(self, KeyFormat::WifKey | KeyFormat::MnemonicPhrase)
    }
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw match, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Format the matcher was looking for
    pub format: KeyFormat,
    /// Normalized matched text
    pub value: String,
    /// Absolute byte offset of the match in the source
    pub offset: u64,
}

impl Candidate {
    /// Creates a new candidate
    pub fn new(format: KeyFormat, value: impl Into<String>, offset: u64) -> Self {
        Self {
            format,
            value: value.into(),
            offset,
        }
    }

    /// Returns the value as a string slice
    pub fn as_str(&self) -> &str {
        &self.value
    }
}
