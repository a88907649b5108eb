//! Byte-level pattern matchers, one per key format.
//!
//! Every matcher runs a `regex::bytes` automaton directly over chunk bytes.
//! All classes are ASCII, so bytes that are not valid text simply never
//! match and act as separators; no decoding step can fail.
//!
//! This differs from decoding with invalid bytes dropped: there, text on
//! either side of a stray byte is joined, so a key interrupted by one byte
//! would still match. Here it does not.
//!
//! Patterns:
//!
//! | format               | pattern                                   |
//! |----------------------|-------------------------------------------|
//! | `HexKey`             | `([0-9A-Fa-f]{2}\s){32,}`                 |
//! | `Bech32Address`      | `bc1[a-z0-9]{11,}`                        |
//! | `ExtendedPublicKey`  | `zpub` + 107..=108 Base58 characters      |
//! | `ExtendedPrivateKey` | `xprv` + 107..=108 Base58 characters      |
//! | `WifKey`             | `[LK]` + 51 Base58 characters             |

use crate::error::{Error, Result};
use crate::format::KeyFormat;
use regex::bytes::Regex;
use std::ops::Range;

/// Base58 alphabet as a regex class (no `0`, `O`, `I`, `l`)
const BASE58_CLASS: &str = "[1-9A-HJ-NP-Za-km-z]";

/// Minimum number of hex byte tokens in a key run
pub const MIN_HEX_TOKENS: usize = 32;

/// Longest fixed-length pattern: a 4-character prefix plus 108 characters
pub const MAX_PATTERN_LEN: usize = 4 + 108;

/// Smallest overlap that keeps every default pattern intact across a chunk
/// boundary
pub const MIN_OVERLAP: usize = MAX_PATTERN_LEN - 1;

/// Finds candidate byte ranges for one key format.
///
/// Implementations must be pure: the same haystack always yields the same
/// ranges, and matching must not depend on bytes before the haystack.
pub trait PatternMatcher: Send + Sync {
    /// Format of the candidates this matcher produces
    fn format(&self) -> KeyFormat;

    /// Longest span of bytes that must be visible at once to decide a match.
    /// The scanner's overlap must be at least this minus one.
    fn span(&self) -> usize;

    /// Non-overlapping matches, leftmost first
    fn find_ranges<'h>(&'h self, haystack: &'h [u8]) -> Box<dyn Iterator<Item = Range<usize>> + 'h>;

    /// Turns matched bytes into the candidate's value
    fn normalize(&self, matched: &[u8]) -> String {
        String::from_utf8_lossy(matched).into_owned()
    }
}

/// A [`PatternMatcher`] backed by a compiled regular expression
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    format: KeyFormat,
    regex: Regex,
    span: usize,
    strip_whitespace: bool,
}

impl RegexMatcher {
    /// Builds a matcher from an arbitrary pattern
    pub fn new(format: KeyFormat, pattern: &str, span: usize) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::internal(format!("bad pattern for {}: {}", format, e)))?;
        Ok(Self {
            format,
            regex,
            span,
            strip_whitespace: false,
        })
    }

    /// Builds the standard matcher for a byte-pattern format
    pub fn for_format(format: KeyFormat) -> Result<Self> {
        match format {
            KeyFormat::HexKey => {
                let pattern = format!(r"(?-u)(?:[0-9A-Fa-f]{{2}}\s){{{},}}", MIN_HEX_TOKENS);
                // One more token of lookahead decides where a run ends
                let mut matcher = Self::new(format, &pattern, (MIN_HEX_TOKENS + 1) * 3)?;
                matcher.strip_whitespace = true;
                Ok(matcher)
            }
            KeyFormat::Bech32Address => Self::new(format, r"(?-u)bc1[a-z0-9]{11,}", 3 + 11 + 1),
            KeyFormat::ExtendedPublicKey => Self::new(
                format,
                &format!(r"(?-u)zpub{}{{107,108}}", BASE58_CLASS),
                MAX_PATTERN_LEN,
            ),
            KeyFormat::ExtendedPrivateKey => Self::new(
                format,
                &format!(r"(?-u)xprv{}{{107,108}}", BASE58_CLASS),
                MAX_PATTERN_LEN,
            ),
            KeyFormat::WifKey => {
                Self::new(format, &format!(r"(?-u)[LK]{}{{51}}", BASE58_CLASS), 52)
            }
            KeyFormat::MnemonicPhrase => Err(Error::invalid_config(
                "mnemonic phrases are found by the word scanner, not a byte pattern",
            )),
        }
    }
}

impl PatternMatcher for RegexMatcher {
    fn format(&self) -> KeyFormat {
        self.format
    }

    fn span(&self) -> usize {
        self.span
    }

    fn find_ranges<'h>(&'h self, haystack: &'h [u8]) -> Box<dyn Iterator<Item = Range<usize>> + 'h> {
        Box::new(self.regex.find_iter(haystack).map(|m| m.range()))
    }

    fn normalize(&self, matched: &[u8]) -> String {
        if self.strip_whitespace {
            matched
                .iter()
                .filter(|b| !b.is_ascii_whitespace())
                .map(|&b| b as char)
                .collect()
        } else {
            String::from_utf8_lossy(matched).into_owned()
        }
    }
}

/// Matchers for the given formats, in the given order
pub fn matchers_for(formats: &[KeyFormat]) -> Result<Vec<Box<dyn PatternMatcher>>> {
    formats
        .iter()
        .map(|&format| RegexMatcher::for_format(format).map(|m| Box::new(m) as Box<dyn PatternMatcher>))
        .collect()
}

/// Matchers for every byte-pattern format
pub fn default_matchers() -> Result<Vec<Box<dyn PatternMatcher>>> {
    matchers_for(&KeyFormat::BYTE_PATTERNS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(format: KeyFormat, haystack: &[u8]) -> Vec<String> {
        let matcher = RegexMatcher::for_format(format).unwrap();
        matcher
            .find_ranges(haystack)
            .map(|r| matcher.normalize(&haystack[r]))
            .collect()
    }

    fn hex_run(tokens: usize) -> String {
        (0..tokens).map(|i| format!("{:02x} ", i)).collect()
    }

    #[test]
    fn test_hex_key_requires_32_tokens() {
        assert!(find(KeyFormat::HexKey, hex_run(31).as_bytes()).is_empty());

        let found = find(KeyFormat::HexKey, format!("xx {}yy", hex_run(32)).as_bytes());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].len(), 64);
        assert!(found[0].starts_with("000102"));
    }

    #[test]
    fn test_hex_key_strips_all_whitespace() {
        let run: String = (0..32).map(|i| format!("{:02X}\n", i)).collect();
        let found = find(KeyFormat::HexKey, run.as_bytes());
        assert_eq!(found.len(), 1);
        assert!(!found[0].contains('\n'));
    }

    #[test]
    fn test_bech32() {
        let found = find(
            KeyFormat::Bech32Address,
            b"\x00\x01bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq\xff",
        );
        assert_eq!(found, vec!["bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"]);
        assert!(find(KeyFormat::Bech32Address, b"bc1short").is_empty());
    }

    #[test]
    fn test_extended_keys_take_108_when_available() {
        let body: String = std::iter::repeat('a').take(110).collect();
        let found = find(KeyFormat::ExtendedPrivateKey, format!("xprv{}", body).as_bytes());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].len(), MAX_PATTERN_LEN);

        let short: String = std::iter::repeat('a').take(107).collect();
        let found = find(KeyFormat::ExtendedPublicKey, format!("zpub{}!", short).as_bytes());
        assert_eq!(found[0].len(), 111);
    }

    #[test]
    fn test_extended_key_rejects_excluded_letters() {
        let body: String = std::iter::repeat('0').take(108).collect();
        assert!(find(KeyFormat::ExtendedPublicKey, format!("zpub{}", body).as_bytes()).is_empty());
    }

    #[test]
    fn test_wif_shape() {
        let key = format!("K{}", "w".repeat(51));
        assert_eq!(find(KeyFormat::WifKey, key.as_bytes()), vec![key.clone()]);
        let bad = format!("M{}", "w".repeat(51));
        assert!(find(KeyFormat::WifKey, bad.as_bytes()).is_empty());
    }

    #[test]
    fn test_invalid_utf8_acts_as_separator() {
        let mut data = b"bc1qqqqqq".to_vec();
        data.push(0xff);
        data.extend_from_slice(b"qqqqqqqq");
        assert!(find(KeyFormat::Bech32Address, &data).is_empty());
    }

    #[test]
    fn test_mnemonic_has_no_byte_pattern() {
        assert!(RegexMatcher::for_format(KeyFormat::MnemonicPhrase).is_err());
    }

    #[test]
    fn test_default_matchers_fit_overlap() {
        let matchers = default_matchers().unwrap();
        assert_eq!(matchers.len(), 5);
        assert!(matchers.iter().all(|m| m.span() <= MIN_OVERLAP + 1));
    }
}
