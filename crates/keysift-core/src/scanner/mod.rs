//! Streaming scanners for key material in binary dumps.
//!
//! ## Algorithm Overview
//!
//! 1. Read the dump as a sequence of overlapping chunks ([`ChunkReader`])
//! 2. Run every [`PatternMatcher`] over each chunk
//! 3. Commit matches that can no longer change; defer the rest to the next
//!    chunk by extending the carried prefix back to where they start
//! 4. Validate committed candidates and count them in an [`OccurrenceTable`]
//!
//! A match is committed when it ends at least `overlap` bytes before the end
//! of the buffered data, or when the stream has ended. Each matcher keeps its
//! own resume offset, so a committed match is never seen twice and a match
//! split at any chunk edge is found exactly once.
//!
//! Committed matches are held back until every matcher has moved past them
//! and then released in offset order, so the table's first-seen order is the
//! same for every chunk size.
//!
//! Mnemonic phrases work on word tokens instead of bytes and live in
//! [`mnemonic`].

pub mod mnemonic;
mod patterns;

use crate::aggregate::OccurrenceTable;
use crate::error::{Error, Result};
use crate::format::{Candidate, KeyFormat};
use crate::reader::{Chunk, ChunkReader};
use crate::validate;
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace, warn};

pub use mnemonic::{MnemonicConfig, MnemonicScan, MnemonicScanner};
pub use patterns::{
    default_matchers, matchers_for, PatternMatcher, RegexMatcher, MAX_PATTERN_LEN, MIN_HEX_TOKENS,
    MIN_OVERLAP,
};

/// Default chunk size for byte-pattern scans (512 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Default overlap; comfortably above [`MIN_OVERLAP`]
pub const DEFAULT_OVERLAP: usize = 128;

/// Configuration for the byte-pattern scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Bytes read from the stream per chunk
    pub chunk_size: usize,
    /// Bytes re-scanned from the end of the previous chunk
    pub overlap: usize,
    /// Upper bound on bytes carried for a deferred match (0 = chunk size)
    pub max_carry: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            max_carry: 0,
        }
    }
}

impl ScanConfig {
    /// Creates a new scan config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the overlap size
    pub fn overlap(mut self, size: usize) -> Self {
        self.overlap = size;
        self
    }

    /// Sets the carry bound for deferred matches
    pub fn max_carry(mut self, size: usize) -> Self {
        self.max_carry = size;
        self
    }

    fn effective_max_carry(&self) -> usize {
        if self.max_carry == 0 {
            self.chunk_size
        } else {
            self.max_carry
        }
    }
}

/// Scans byte streams with a set of [`PatternMatcher`]s
pub struct PatternScanner {
    config: ScanConfig,
    matchers: Vec<Box<dyn PatternMatcher>>,
}

impl std::fmt::Debug for PatternScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternScanner")
            .field("config", &self.config)
            .field(
                "formats",
                &self.matchers.iter().map(|m| m.format()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PatternScanner {
    /// Creates a scanner for every byte-pattern format with default settings
    pub fn new() -> Result<Self> {
        Self::with_matchers(ScanConfig::default(), default_matchers()?)
    }

    /// Creates a scanner for the given formats
    pub fn for_formats(config: ScanConfig, formats: &[KeyFormat]) -> Result<Self> {
        Self::with_matchers(config, matchers_for(formats)?)
    }

    /// Creates a scanner with custom matchers. Fails if the overlap is too
    /// small for the longest matcher span.
    pub fn with_matchers(config: ScanConfig, matchers: Vec<Box<dyn PatternMatcher>>) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::invalid_config("chunk size must be greater than zero"));
        }
        let required = matchers
            .iter()
            .map(|m| m.span().saturating_sub(1))
            .max()
            .unwrap_or(0);
        if config.overlap < required {
            return Err(Error::invalid_config(format!(
                "overlap of {} bytes is below the {} bytes needed by the selected patterns",
                config.overlap, required
            )));
        }
        if config.overlap >= config.chunk_size {
            return Err(Error::invalid_config(format!(
                "overlap ({}) must be smaller than the chunk size ({})",
                config.overlap, config.chunk_size
            )));
        }
        Ok(Self { config, matchers })
    }

    /// The active configuration
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Formats this scanner looks for
    pub fn formats(&self) -> Vec<KeyFormat> {
        self.matchers.iter().map(|m| m.format()).collect()
    }

    /// Scans a file from the beginning
    pub fn scan_file(&self, path: impl AsRef<Path>) -> Result<OccurrenceTable> {
        let reader = ChunkReader::open(path, self.config.chunk_size, self.config.overlap)?;
        self.scan(reader)
    }

    /// Scans any reader from the beginning
    pub fn scan_reader<R: Read>(&self, inner: R) -> Result<OccurrenceTable> {
        let reader = ChunkReader::new(inner, self.config.chunk_size, self.config.overlap)?;
        self.scan(reader)
    }

    /// Scans the chunks of a prepared reader
    pub fn scan<R: Read>(&self, reader: ChunkReader<R>) -> Result<OccurrenceTable> {
        let mut table = OccurrenceTable::new();
        self.scan_with(reader, |candidate| {
            match validate::validate(&candidate, None) {
                Ok(()) => {
                    trace!("accepted {} at {}", candidate.format, candidate.offset);
                    table.record(candidate);
                }
                Err(rejection) => {
                    trace!(
                        "rejected {} at {}: {}",
                        candidate.format,
                        candidate.offset,
                        rejection
                    );
                    table.record_rejection(candidate.format);
                }
            }
        })?;

        debug!(
            "scan complete: {} distinct items, {} rejected",
            table.len(),
            table.rejected()
        );
        Ok(table)
    }

    /// Streams raw, unvalidated candidates to `sink` in stream order: by
    /// offset, then by matcher order. The order does not depend on the chunk
    /// size.
    pub fn scan_with<R: Read>(
        &self,
        mut reader: ChunkReader<R>,
        mut sink: impl FnMut(Candidate),
    ) -> Result<()> {
        reader = reader.with_max_carry(self.config.effective_max_carry());
        let mut resume = vec![reader.position(); self.matchers.len()];
        let mut pending: Vec<(usize, Candidate)> = Vec::new();

        while let Some(chunk) = reader.next() {
            let chunk = chunk?;
            let carry = self.scan_chunk(&chunk, reader.max_carry(), &mut resume, &mut pending);

            // Later chunks only commit matches starting at or after `carry`
            pending.sort_by_key(|(matcher, c)| (c.offset, *matcher));
            let ready = pending.partition_point(|(_, c)| c.offset < carry);
            pending.drain(..ready).for_each(|(_, c)| sink(c));

            reader.carry_from(carry);
        }

        pending.sort_by_key(|(matcher, c)| (c.offset, *matcher));
        pending.into_iter().for_each(|(_, c)| sink(c));
        Ok(())
    }

    /// Runs every matcher over one chunk, appending committed matches to
    /// `committed` tagged with the matcher's position. Returns the absolute
    /// offset the next chunk must start at.
    fn scan_chunk(
        &self,
        chunk: &Chunk,
        max_carry: usize,
        resume: &mut [u64],
        committed: &mut Vec<(usize, Candidate)>,
    ) -> u64 {
        let data = chunk.data();
        let tail = if chunk.is_last() {
            data.len()
        } else {
            data.len().saturating_sub(self.config.overlap)
        };
        let tail_offset = chunk.offset() + tail as u64;
        let mut carry = chunk.end_offset();

        for (i, (matcher, resume)) in self.matchers.iter().zip(resume.iter_mut()).enumerate() {
            let start = chunk.index_of(*resume);
            let mut next = tail_offset.max(*resume);

            for range in matcher.find_ranges(&data[start..]) {
                let (s, e) = (start + range.start, start + range.end);

                if e > tail {
                    if data.len() - s <= max_carry {
                        trace!(
                            "deferring {} match at {} to next chunk",
                            matcher.format(),
                            chunk.offset() + s as u64
                        );
                        next = chunk.offset() + s as u64;
                        break;
                    }
                    warn!(
                        "{} match at {} spans {} bytes, committing without further context",
                        matcher.format(),
                        chunk.offset() + s as u64,
                        e - s
                    );
                }

                committed.push((
                    i,
                    Candidate::new(
                        matcher.format(),
                        matcher.normalize(&data[s..e]),
                        chunk.offset() + s as u64,
                    ),
                ));
                next = next.max(chunk.offset() + e as u64);
            }

            *resume = next;
            carry = carry.min(next);
        }

        carry
    }
}

/// Scan a file for every byte-pattern format with default settings
pub fn scan_file(path: impl AsRef<Path>) -> Result<OccurrenceTable> {
    PatternScanner::new()?.scan_file(path)
}

/// Scan a file with custom configuration
pub fn scan_file_with_config(path: impl AsRef<Path>, config: ScanConfig) -> Result<OccurrenceTable> {
    PatternScanner::with_matchers(config, default_matchers()?)?.scan_file(path)
}
