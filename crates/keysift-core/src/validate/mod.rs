//! Format-specific acceptance checks.
//!
//! WIF keys and mnemonic phrases carry checksums and are verified. Hex keys,
//! Bech32 addresses and extended keys are accepted on shape alone; that
//! trades false positives for never missing a real key, and reports say so.

pub mod bip39;
pub mod wif;

use crate::error::{Rejection, ValidationResult};
use crate::format::{Candidate, KeyFormat};
use crate::wordlist::Wordlist;

pub use bip39::{validate_indices, validate_phrase, MAX_PHRASE_WORDS, PHRASE_LENGTHS};
pub use wif::{double_sha256, validate_wif};

/// Validates a candidate according to its format. Mnemonic phrases need a
/// wordlist; without one every word is unknown.
pub fn validate(candidate: &Candidate, wordlist: Option<&Wordlist>) -> ValidationResult {
    match candidate.format {
        KeyFormat::WifKey => validate_wif(&candidate.value),
        KeyFormat::MnemonicPhrase => match wordlist {
            Some(wordlist) => validate_phrase(&candidate.value, wordlist),
            None => Err(Rejection::UnknownWord {
                word: candidate
                    .value
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            }),
        },
        KeyFormat::HexKey
        | KeyFormat::Bech32Address
        | KeyFormat::ExtendedPublicKey
        | KeyFormat::ExtendedPrivateKey => Ok(()),
    }
}
