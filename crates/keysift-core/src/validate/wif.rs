//! Base58Check verification for WIF private keys.

use crate::error::{Rejection, ValidationResult};
use sha2::{Digest, Sha256};

/// Trailing checksum bytes in a Base58Check payload
pub const CHECKSUM_LEN: usize = 4;

/// SHA-256 applied twice
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Checks a WIF candidate.
///
/// The body before the checksum must be a version byte and a 32-byte key,
/// optionally followed by the compression flag.
pub fn validate_wif(candidate: &str) -> ValidationResult {
    let decoded = bs58::decode(candidate)
        .into_vec()
        .map_err(|_| Rejection::MalformedEncoding)?;

    let body_len = decoded.len().saturating_sub(CHECKSUM_LEN);
    if decoded.len() < CHECKSUM_LEN || !(33..=34).contains(&body_len) {
        return Err(Rejection::LengthMismatch {
            expected: "33 or 34",
            actual: body_len,
        });
    }

    let (body, checksum) = decoded.split_at(body_len);
    if double_sha256(body)[..CHECKSUM_LEN] == *checksum {
        Ok(())
    } else {
        Err(Rejection::ChecksumMismatch)
    }
}
