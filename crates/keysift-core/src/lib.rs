//! # keysift-core
//!
//! A library for finding cryptocurrency key material in large binary dumps.
//!
//! This crate provides the core functionality for:
//! - Reading files of any size in bounded chunks without losing matches that
//!   straddle chunk boundaries
//! - Matching hex keys, Bech32 addresses, extended keys, WIF keys and BIP-39
//!   mnemonic phrases
//! - Verifying WIF and BIP-39 checksums
//! - Counting distinct findings and rendering reports
//! - Resuming long mnemonic scans after interruption
//!
//! ## Architecture
//!
//! - [`reader`]: Chunked reading with carried overlap
//! - [`scanner`]: Pattern and mnemonic scanners
//! - [`validate`]: Checksum validation
//! - [`aggregate`]: Occurrence counting
//! - [`progress`]: Resumable progress tracking
//! - [`report`]: Report rendering
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use keysift_core::{render, PatternScanner, ReportKind};
//!
//! let scanner = PatternScanner::new()?;
//! let table = scanner.scan_file("./memory.dmp")?;
//!
//! for kind in [ReportKind::UniqueKeyReport, ReportKind::UniqueAddressReport] {
//!     println!("{}", render(&table, kind));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`PatternMatcher`]: Add a byte pattern to the scanner
//! - [`ReportWriter`]: Customize how reports are written

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod aggregate;
pub mod error;
pub mod format;
pub mod progress;
pub mod reader;
pub mod report;
pub mod scanner;
pub mod validate;
pub mod wordlist;

// Re-export primary types for convenience
pub use aggregate::{Entry, OccurrenceTable, Summary};
pub use error::{Error, Rejection, Result, ValidationResult};
pub use format::{Candidate, KeyFormat};
pub use progress::{ProgressState, ProgressTracker};
pub use reader::{Chunk, ChunkReader};
pub use report::{
    render, report_file_name, shape_only_note, ReportKind, ReportWriter, SummaryOnly, TextReport,
};
pub use scanner::{
    MnemonicConfig, MnemonicScan, MnemonicScanner, PatternMatcher, PatternScanner, RegexMatcher,
    ScanConfig,
};
pub use wordlist::Wordlist;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
