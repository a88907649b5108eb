//! BIP-39 mnemonic checksum verification.
//!
//! A phrase of `n` words packs `11 * n` bits. The last `n / 3` bits are the
//! checksum: the leading bits of SHA-256 over the entropy bits before them.

use crate::error::{Rejection, ValidationResult};
use crate::wordlist::Wordlist;
use sha2::{Digest, Sha256};

/// Phrase lengths this validator accepts
pub const PHRASE_LENGTHS: [usize; 3] = [12, 18, 24];

/// Longest valid phrase
pub const MAX_PHRASE_WORDS: usize = 24;

const BITS_PER_WORD: usize = 11;

/// Checks a space-separated phrase against the wordlist
pub fn validate_phrase(phrase: &str, wordlist: &Wordlist) -> ValidationResult {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if !PHRASE_LENGTHS.contains(&words.len()) {
        return Err(Rejection::WordCount { count: words.len() });
    }

    let indices = words
        .iter()
        .map(|word| {
            wordlist.index_of(word).ok_or_else(|| Rejection::UnknownWord {
                word: (*word).to_string(),
            })
        })
        .collect::<Result<Vec<u16>, Rejection>>()?;

    validate_indices(&indices)
}

/// Checks a phrase already resolved to word indices (each below 2048)
pub fn validate_indices(indices: &[u16]) -> ValidationResult {
    let count = indices.len();
    if !PHRASE_LENGTHS.contains(&count) {
        return Err(Rejection::WordCount { count });
    }

    let total_bits = count * BITS_PER_WORD;
    let checksum_bits = count / 3;
    let entropy_bytes = (total_bits - checksum_bits) / 8;

    let mut packed = vec![0u8; total_bits.div_ceil(8)];
    for (i, &index) in indices.iter().enumerate() {
        for bit in 0..BITS_PER_WORD {
            if index & (1 << (BITS_PER_WORD - 1 - bit)) != 0 {
                let pos = i * BITS_PER_WORD + bit;
                packed[pos / 8] |= 0x80 >> (pos % 8);
            }
        }
    }

    // checksum_bits is at most 8, so the stored checksum sits at the top of
    // the first byte after the entropy
    let shift = 8 - checksum_bits;
    let stored = packed[entropy_bytes] >> shift;
    let expected = Sha256::digest(&packed[..entropy_bytes])[0] >> shift;

    if stored == expected {
        Ok(())
    } else {
        Err(Rejection::ChecksumMismatch)
    }
}
