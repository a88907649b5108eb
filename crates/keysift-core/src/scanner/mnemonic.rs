//! Mnemonic phrase extraction.
//!
//! The dump is tokenized into word-character runs (`\w+`, Unicode aware);
//! runs found in the wordlist become tokens, everything else is ignored.
//! Invalid UTF-8 ends a run like any other separator; it is not dropped with
//! the text on both sides joined into one word.
//! Every contiguous window of 12, 18 and 24 tokens is checked against the
//! BIP-39 checksum.
//!
//! ## Chunk boundaries
//!
//! - A word run touching the end of the buffer may continue in the next
//!   chunk, so its bytes are carried and it is tokenized there. Runs longer
//!   than any wordlist word are skipped instead of carried.
//! - An incomplete UTF-8 sequence at the end of the buffer is always carried.
//! - The last `token_overlap` tokens are kept in memory. A window is checked
//!   once, in the chunk where its first token stops being part of that tail,
//!   or at end of stream.
//!
//! ## Resuming
//!
//! With a progress directory configured, every chunk ends with a commit of
//! the earliest offset still needed: the first kept token, or the start of
//! the word run being carried. Resuming reads from there and rebuilds the
//! same tokens, so an interrupted scan ends with the same table as an
//! uninterrupted one.

use crate::aggregate::OccurrenceTable;
use crate::error::{Error, Result};
use crate::format::{Candidate, KeyFormat};
use crate::progress::ProgressTracker;
use crate::reader::{Chunk, ChunkReader};
use crate::validate::{validate_indices, MAX_PHRASE_WORDS, PHRASE_LENGTHS};
use crate::wordlist::Wordlist;
use regex::bytes::Regex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default chunk size for mnemonic scans (1 MiB)
pub const DEFAULT_MNEMONIC_CHUNK_SIZE: usize = 1024 * 1024;

/// Tokens that must be kept between chunks so no window is split
pub const MIN_TOKEN_OVERLAP: usize = MAX_PHRASE_WORDS - 1;

/// Smallest chunk size accepted for word scanning
pub const MIN_MNEMONIC_CHUNK_SIZE: usize = 64;

/// Configuration for the mnemonic scanner
#[derive(Debug, Clone)]
pub struct MnemonicConfig {
    /// Bytes read from the stream per chunk
    pub chunk_size: usize,
    /// Tokens kept from one chunk to the next
    pub token_overlap: usize,
    /// Directory holding progress and journal files; `None` disables resume
    pub progress_dir: Option<PathBuf>,
}

impl Default for MnemonicConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_MNEMONIC_CHUNK_SIZE,
            token_overlap: MIN_TOKEN_OVERLAP,
            progress_dir: None,
        }
    }
}

impl MnemonicConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the token overlap
    pub fn token_overlap(mut self, tokens: usize) -> Self {
        self.token_overlap = tokens;
        self
    }

    /// Enables progress tracking in `dir`
    pub fn progress_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.progress_dir = Some(dir.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Token {
    index: u16,
    offset: u64,
}

/// Finds BIP-39 phrases using a loaded wordlist
#[derive(Debug)]
pub struct MnemonicScanner<'w> {
    wordlist: &'w Wordlist,
    config: MnemonicConfig,
    word: Regex,
}

impl<'w> MnemonicScanner<'w> {
    /// Creates a scanner. Fails if the chunk size or token overlap is too
    /// small.
    pub fn new(wordlist: &'w Wordlist, config: MnemonicConfig) -> Result<Self> {
        if config.chunk_size < MIN_MNEMONIC_CHUNK_SIZE {
            return Err(Error::invalid_config(format!(
                "mnemonic chunk size must be at least {} bytes",
                MIN_MNEMONIC_CHUNK_SIZE
            )));
        }
        if config.token_overlap < MIN_TOKEN_OVERLAP {
            return Err(Error::invalid_config(format!(
                "token overlap of {} is below the {} needed for {}-word phrases",
                config.token_overlap, MIN_TOKEN_OVERLAP, MAX_PHRASE_WORDS
            )));
        }
        let word = Regex::new(r"\w+").map_err(|e| Error::internal(e.to_string()))?;
        Ok(Self {
            wordlist,
            config,
            word,
        })
    }

    /// The active configuration
    pub fn config(&self) -> &MnemonicConfig {
        &self.config
    }

    /// Word indices of the wordlist words in `text`, in order
    pub fn tokenize(&self, text: &[u8]) -> Vec<u16> {
        self.word
            .find_iter(text)
            .filter_map(|m| self.wordlist.index_of_bytes(m.as_bytes()))
            .collect()
    }

    /// Scans a file to completion, resuming if progress was stored
    pub fn scan_file(&self, path: impl AsRef<Path>) -> Result<OccurrenceTable> {
        self.start(path)?.finish()
    }

    /// Opens a file scan that can be driven chunk by chunk
    pub fn start(&self, path: impl AsRef<Path>) -> Result<MnemonicScan<'_, File>> {
        let path = path.as_ref();
        let reader = ChunkReader::open(path, self.config.chunk_size, 0)?;

        let mut tracker = match &self.config.progress_dir {
            Some(dir) => Some(ProgressTracker::open(dir, path)?),
            None => None,
        };
        let start = tracker.as_ref().map_or(0, ProgressTracker::start_offset);
        let reader = reader.resume_at(start)?;

        let mut table = OccurrenceTable::new();
        if let Some(tracker) = tracker.as_mut() {
            tracker.restore_into(&mut table);
        }

        Ok(MnemonicScan::new(self, reader, tracker, table, start))
    }

    /// Opens a scan over any reader, without progress tracking
    pub fn start_reader<R: Read>(&self, inner: R) -> Result<MnemonicScan<'_, R>> {
        let reader = ChunkReader::new(inner, self.config.chunk_size, 0)?;
        Ok(MnemonicScan::new(self, reader, None, OccurrenceTable::new(), 0))
    }
}

/// An in-progress mnemonic scan
#[derive(Debug)]
pub struct MnemonicScan<'s, R> {
    scanner: &'s MnemonicScanner<'s>,
    reader: ChunkReader<R>,
    tracker: Option<ProgressTracker>,
    table: OccurrenceTable,
    tokens: Vec<Token>,
    inside_run: bool,
    run_origin: Option<u64>,
    start_offset: u64,
    finished: bool,
}

impl<'s, R: Read> MnemonicScan<'s, R> {
    fn new(
        scanner: &'s MnemonicScanner<'s>,
        reader: ChunkReader<R>,
        tracker: Option<ProgressTracker>,
        table: OccurrenceTable,
        start_offset: u64,
    ) -> Self {
        let max_carry = scanner.wordlist.max_word_len() + 4;
        Self {
            scanner,
            reader: reader.with_max_carry(max_carry),
            tracker,
            table,
            tokens: Vec::with_capacity(2 * MAX_PHRASE_WORDS),
            inside_run: false,
            run_origin: None,
            start_offset,
            finished: false,
        }
    }

    /// Offset the scan started (or resumed) at
    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Phrases found so far, including any restored from a previous run
    pub fn table(&self) -> &OccurrenceTable {
        &self.table
    }

    /// True once the whole stream has been processed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Processes one chunk. Returns `false` once the stream is exhausted.
    pub fn step(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }

        let chunk = match self.reader.next() {
            Some(chunk) => chunk?,
            None => {
                // Stream ended on a chunk boundary with nothing carried
                let accepted = self.evaluate_windows(true);
                self.commit(self.reader.position(), accepted)?;
                self.finished = true;
                return Ok(false);
            }
        };

        let last = chunk.is_last();
        let carry = self.tokenize_chunk(&chunk);
        let accepted = self.evaluate_windows(last);

        if last {
            self.commit(chunk.end_offset(), accepted)?;
            self.finished = true;
            return Ok(false);
        }

        let resume = self.resume_point(carry);
        self.commit(resume, accepted)?;
        self.reader.carry_from(carry);
        Ok(true)
    }

    /// Runs the scan to the end and returns the table
    pub fn finish(mut self) -> Result<OccurrenceTable> {
        while self.step()? {}
        debug!(
            "mnemonic scan complete: {} distinct phrases",
            self.table.len()
        );
        Ok(self.table)
    }

    /// Appends the chunk's tokens. Returns the absolute offset the next
    /// chunk must start at.
    fn tokenize_chunk(&mut self, chunk: &Chunk) -> u64 {
        let data = chunk.data();
        let last = chunk.is_last();
        let limit = if last {
            data.len()
        } else {
            complete_utf8_len(data)
        };
        let mut carry = chunk.offset() + limit as u64;

        let mut inside = std::mem::take(&mut self.inside_run);
        for m in self.scanner.word.find_iter(&data[..limit]) {
            let continues = inside && m.start() == 0;
            inside = false;
            let start = chunk.offset() + m.start() as u64;

            if !last && m.end() == limit {
                let run_len = m.end() - m.start();
                if !continues && run_len <= self.scanner.wordlist.max_word_len() {
                    carry = start;
                } else {
                    // Too long for any word however it ends
                    self.inside_run = true;
                    if !continues {
                        self.run_origin = Some(start);
                    }
                }
                break;
            }

            if continues {
                continue;
            }

            if let Some(index) = self.scanner.wordlist.index_of_bytes(m.as_bytes()) {
                self.tokens.push(Token {
                    index,
                    offset: start,
                });
            }
        }

        if !self.inside_run {
            self.run_origin = None;
        }
        carry
    }

    /// Checks every window whose first token will not be kept, and drops
    /// those tokens
    fn evaluate_windows(&mut self, last: bool) -> Vec<Candidate> {
        let n = self.tokens.len();
        let keep = if last {
            0
        } else {
            self.scanner.config.token_overlap
        };
        let starts = n.saturating_sub(keep);

        let mut accepted = Vec::new();
        let mut indices = Vec::with_capacity(MAX_PHRASE_WORDS);
        for i in 0..starts {
            for len in PHRASE_LENGTHS {
                if i + len > n {
                    break;
                }
                let window = &self.tokens[i..i + len];
                indices.clear();
                indices.extend(window.iter().map(|t| t.index));

                if validate_indices(&indices).is_ok() {
                    let phrase = indices
                        .iter()
                        .map(|&index| self.scanner.wordlist.word(index))
                        .collect::<Vec<_>>()
                        .join(" ");
                    trace!("{}-word phrase at {}", len, window[0].offset);
                    accepted.push(Candidate::new(
                        KeyFormat::MnemonicPhrase,
                        phrase,
                        window[0].offset,
                    ));
                }
            }
        }

        self.tokens.drain(..starts);
        accepted
    }

    fn resume_point(&self, carry: u64) -> u64 {
        let boundary = if self.inside_run {
            self.run_origin.unwrap_or(carry)
        } else {
            carry
        };
        self.tokens
            .first()
            .map_or(boundary, |t| t.offset.min(boundary))
    }

    fn commit(&mut self, offset: u64, accepted: Vec<Candidate>) -> Result<()> {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.commit(offset, &accepted)?;
        }
        for candidate in accepted {
            debug!("seed phrase at offset {}", candidate.offset);
            self.table.record(candidate);
        }
        Ok(())
    }
}

/// Length of `data` without a trailing incomplete UTF-8 sequence
fn complete_utf8_len(data: &[u8]) -> usize {
    let n = data.len();
    for back in 1..=n.min(3) {
        let byte = data[n - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xF0..=0xF7 => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            // ASCII, or a byte that never starts a sequence
            _ => 1,
        };
        return if needed > back { n - back } else { n };
    }
    n
}
