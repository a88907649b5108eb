//! Durable resume state for the mnemonic scan.
//!
//! Two files per (input, output directory) pair:
//!
//! - `<stem>.<hash>.progress`: one decimal line, the offset the scan can
//!   resume from. Replaced atomically (temp file, fsync, rename).
//! - `<stem>.<hash>.found`: append-only journal of accepted phrases. Each
//!   batch is closed by a `@<offset>` marker naming the progress offset it
//!   belongs to.
//!
//! A batch counts only if its marker does not exceed the stored offset, so a
//! crash between writing the journal and the progress file never counts a
//! chunk twice.
//!
//! Running two scans against the same pair at once is not supported and is
//! not detected.

use crate::aggregate::OccurrenceTable;
use crate::error::{Error, Result};
use crate::format::{Candidate, KeyFormat};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where a tracker starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    /// No stored progress; scan from the beginning
    Fresh,
    /// Stored progress found; scan from `offset`
    Resuming {
        /// Stored resume offset
        offset: u64,
    },
}

/// Persists scan progress and accepted phrases
#[derive(Debug)]
pub struct ProgressTracker {
    progress_path: PathBuf,
    journal_path: PathBuf,
    journal: File,
    state: ProgressState,
    committed: u64,
    replayed: Vec<Candidate>,
}

impl ProgressTracker {
    /// Progress and journal paths for `input` inside `dir`
    pub fn paths_for(dir: &Path, input: &Path) -> (PathBuf, PathBuf) {
        let canonical = fs::canonicalize(input).unwrap_or_else(|_| input.to_path_buf());
        let hash = blake3::hash(canonical.to_string_lossy().as_bytes());
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        let base = format!("{}.{}", stem, &hash.to_hex()[..8]);
        (
            dir.join(format!("{}.progress", base)),
            dir.join(format!("{}.found", base)),
        )
    }

    /// Opens (or creates) the resume state for `input` in `dir`
    pub fn open(dir: impl AsRef<Path>, input: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| Error::directory_create(dir, e))?;
        let (progress_path, journal_path) = Self::paths_for(dir, input.as_ref());

        let state = match fs::read_to_string(&progress_path) {
            Ok(text) => {
                let offset = text.trim().parse::<u64>().map_err(|_| {
                    Error::corrupt_progress(&progress_path, format!("'{}' is not an offset", text.trim()))
                })?;
                ProgressState::Resuming { offset }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProgressState::Fresh,
            Err(e) => return Err(Error::file_read(&progress_path, e)),
        };

        let mut journal = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&journal_path)
            .map_err(|e| Error::file_write(&journal_path, e))?;

        let (committed, replayed) = match state {
            ProgressState::Fresh => {
                journal
                    .set_len(0)
                    .map_err(|e| Error::file_write(&journal_path, e))?;
                (0, Vec::new())
            }
            ProgressState::Resuming { offset } => {
                let replayed = Self::replay(&mut journal, &journal_path, offset)?;
                info!(
                    "resuming {} at offset {} ({} phrases recovered)",
                    input.as_ref().display(),
                    offset,
                    replayed.len()
                );
                (offset, replayed)
            }
        };

        journal
            .seek(SeekFrom::End(0))
            .map_err(|e| Error::file_write(&journal_path, e))?;

        Ok(Self {
            progress_path,
            journal_path,
            journal,
            state,
            committed,
            replayed,
        })
    }

    /// Removes stored progress for `input` so the next scan starts fresh
    pub fn reset(dir: impl AsRef<Path>, input: impl AsRef<Path>) -> Result<()> {
        let (progress_path, journal_path) = Self::paths_for(dir.as_ref(), input.as_ref());
        for path in [progress_path, journal_path] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::file_write(&path, e)),
            }
        }
        Ok(())
    }

    /// State found when the tracker was opened
    pub fn state(&self) -> ProgressState {
        self.state
    }

    /// Offset the scan should start reading at
    pub fn start_offset(&self) -> u64 {
        match self.state {
            ProgressState::Fresh => 0,
            ProgressState::Resuming { offset } => offset,
        }
    }

    /// Last committed offset
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Path of the progress file
    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    /// Path of the findings journal
    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    /// Moves phrases recovered from the journal into `table`
    pub fn restore_into(&mut self, table: &mut OccurrenceTable) {
        for candidate in self.replayed.drain(..) {
            table.record(candidate);
        }
    }

    /// Durably records `accepted` and then advances the stored offset.
    ///
    /// The offset never moves backwards, and a batch of phrases must come
    /// with a strictly larger offset so it cannot be confused with an
    /// earlier one.
    pub fn commit(&mut self, offset: u64, accepted: &[Candidate]) -> Result<()> {
        if offset < self.committed
            || (!accepted.is_empty()
                && offset == self.committed
                && self.state != ProgressState::Fresh)
        {
            return Err(Error::corrupt_progress(
                &self.progress_path,
                format!(
                    "refusing to move progress from {} to {}",
                    self.committed, offset
                ),
            ));
        }

        if !accepted.is_empty() {
            let mut batch = String::new();
            for candidate in accepted {
                batch.push_str(&format!("+{}\t{}\n", candidate.offset, candidate.value));
            }
            batch.push_str(&format!("@{}\n", offset));
            self.journal
                .write_all(batch.as_bytes())
                .and_then(|()| self.journal.sync_data())
                .map_err(|e| Error::file_write(&self.journal_path, e))?;
        }

        let tmp = self.progress_path.with_extension("progress.tmp");
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(format!("{}\n", offset).as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.progress_path)
        };
        write().map_err(|e| Error::file_write(&self.progress_path, e))?;

        self.committed = offset;
        if self.state == ProgressState::Fresh {
            self.state = ProgressState::Resuming { offset };
        }
        Ok(())
    }

    /// Reads committed batches and truncates anything after the last one
    fn replay(journal: &mut File, path: &Path, limit: u64) -> Result<Vec<Candidate>> {
        let mut text = String::new();
        journal
            .read_to_string(&mut text)
            .map_err(|e| Error::file_read(path, e))?;

        let mut committed = Vec::new();
        let mut pending = Vec::new();
        let mut valid_len = 0usize;
        let mut position = 0usize;

        for line in text.split_inclusive('\n') {
            position += line.len();
            let Some(line) = line.strip_suffix('\n') else {
                // Torn write at the end of the journal
                break;
            };

            if let Some(marker) = line.strip_prefix('@') {
                let offset: u64 = marker
                    .parse()
                    .map_err(|_| Error::corrupt_progress(path, format!("bad marker '{}'", line)))?;
                if offset > limit {
                    break;
                }
                committed.append(&mut pending);
                valid_len = position;
            } else if let Some(entry) = line.strip_prefix('+') {
                let (at, phrase) = entry
                    .split_once('\t')
                    .ok_or_else(|| Error::corrupt_progress(path, format!("bad entry '{}'", line)))?;
                let at: u64 = at
                    .parse()
                    .map_err(|_| Error::corrupt_progress(path, format!("bad entry '{}'", line)))?;
                pending.push(Candidate::new(KeyFormat::MnemonicPhrase, phrase, at));
            } else {
                return Err(Error::corrupt_progress(path, format!("unexpected line '{}'", line)));
            }
        }

        if valid_len < text.len() {
            debug!(
                "discarding {} uncommitted journal bytes in {}",
                text.len() - valid_len,
                path.display()
            );
            journal
                .set_len(valid_len as u64)
                .map_err(|e| Error::file_write(path, e))?;
        }

        Ok(committed)
    }
}
