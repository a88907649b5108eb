//! Error types for the keysift-core library.
//!
//! Two families live here. [`Error`] covers failures of a scan as a whole
//! (missing input, I/O, bad configuration, unreadable progress state).
//! [`Rejection`] covers a single candidate failing validation; those are
//! recovered locally by dropping the candidate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for keysift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of validating one candidate: `Ok(())` means accepted.
pub type ValidationResult = std::result::Result<(), Rejection>;

/// Error type for all keysift operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input path does not exist
    #[error("file not found: '{path}'")]
    FileNotFound {
        /// The missing path
        path: PathBuf,
    },

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Scan configuration violates an invariant
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Wordlist is not a list of 2048 distinct words
    #[error("invalid wordlist: {details}")]
    Wordlist {
        /// What is wrong with it
        details: String,
    },

    /// Stored progress could not be used
    #[error("corrupt progress file '{path}': {details}")]
    CorruptProgress {
        /// Path to the progress file
        path: PathBuf,
        /// What is wrong with it
        details: String,
    },

    /// A working buffer could not be allocated
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new file read error, mapping `NotFound` to [`Error::FileNotFound`]
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::FileNotFound { path };
        }
        Self::FileRead { path, source }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Creates a new wordlist error
    pub fn wordlist(details: impl Into<String>) -> Self {
        Self::Wordlist {
            details: details.into(),
        }
    }

    /// Creates a new corrupt progress error
    pub fn corrupt_progress(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::CorruptProgress {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the failure is confined to one input and a batch may
    /// carry on with the next file
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. } | Self::FileRead { .. } | Self::CorruptProgress { .. }
        )
    }
}

/// Why a candidate failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    /// Not decodable in the expected alphabet
    #[error("malformed encoding")]
    MalformedEncoding,

    /// Decoded payload has the wrong size
    #[error("payload is {actual} bytes, expected {expected}")]
    LengthMismatch {
        /// Accepted sizes
        expected: &'static str,
        /// Observed size
        actual: usize,
    },

    /// Embedded checksum does not match the recomputed one
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Phrase contains a word missing from the wordlist
    #[error("unknown word '{word}'")]
    UnknownWord {
        /// The offending word
        word: String,
    },

    /// Phrase is not 12, 18 or 24 words long
    #[error("phrase has {count} words, expected 12, 18 or 24")]
    WordCount {
        /// Observed word count
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::corrupt_progress("/tmp/dump.progress", "not a number");
        assert!(err.to_string().contains("corrupt progress"));
        assert!(err.to_string().contains("/tmp/dump.progress"));
    }

    #[test]
    fn test_not_found_maps_to_file_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            Error::file_read("/missing.mem", io),
            Error::FileNotFound { .. }
        ));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::corrupt_progress("/p", "x").is_recoverable());
        assert!(!Error::invalid_config("overlap").is_recoverable());
        assert!(!Error::ResourceExhaustion("oom".into()).is_recoverable());
    }

    #[test]
    fn test_rejection_display() {
        let r = Rejection::UnknownWord {
            word: "zzz".to_string(),
        };
        assert_eq!(r.to_string(), "unknown word 'zzz'");
        let r = Rejection::LengthMismatch {
            expected: "33 or 34",
            actual: 12,
        };
        assert_eq!(r.to_string(), "payload is 12 bytes, expected 33 or 34");
    }
}
