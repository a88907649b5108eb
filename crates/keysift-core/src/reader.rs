//! Chunked stream reading with a carried overlap window.
//!
//! [`ChunkReader`] turns any [`Read`] into a finite sequence of [`Chunk`]s.
//! Every chunk holds the bytes carried over from the previous chunk followed
//! by up to `chunk_size` freshly read bytes, so a pattern straddling a block
//! boundary is visible in one piece.
//!
//! The carry defaults to the trailing `overlap` bytes. A consumer that knows
//! a match may still be growing can ask for an earlier start with
//! [`ChunkReader::carry_from`]; the request is bounded by `max_carry` so the
//! working set never exceeds `chunk_size + max_carry` bytes.

use crate::error::{Error, Result};
use bytes::Bytes;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// A block of the stream plus its carried prefix
#[derive(Debug, Clone)]
pub struct Chunk {
    data: Bytes,
    offset: u64,
    fresh: usize,
    last: bool,
}

impl Chunk {
    /// Carried prefix followed by the freshly read bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Absolute stream offset of `data()[0]`
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Absolute stream offset one past the last byte
    pub fn end_offset(&self) -> u64 {
        self.offset + self.data.len() as u64
    }

    /// Index in `data()` where the freshly read bytes begin
    pub fn fresh_start(&self) -> usize {
        self.fresh
    }

    /// Number of bytes read from the stream for this chunk
    pub fn fresh_len(&self) -> usize {
        self.data.len() - self.fresh
    }

    /// True when the stream ended with this chunk
    pub fn is_last(&self) -> bool {
        self.last
    }

    /// Total buffered length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the chunk holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Translates an absolute offset into an index into `data()`, clamped to
    /// the chunk
    pub fn index_of(&self, offset: u64) -> usize {
        offset.saturating_sub(self.offset).min(self.data.len() as u64) as usize
    }
}

/// Lazy, finite reader of overlapping chunks
#[derive(Debug)]
pub struct ChunkReader<R> {
    inner: R,
    source: PathBuf,
    chunk_size: usize,
    overlap: usize,
    max_carry: usize,
    previous: Option<Chunk>,
    requested_carry: Option<u64>,
    position: u64,
    finished: bool,
}

impl ChunkReader<File> {
    /// Opens a file for chunked reading
    pub fn open(path: impl AsRef<Path>, chunk_size: usize, overlap: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
        let mut reader = Self::new(file, chunk_size, overlap)?;
        reader.source = path.to_path_buf();
        Ok(reader)
    }
}

impl<R: Read> ChunkReader<R> {
    /// Wraps a reader. `chunk_size` must be non-zero.
    pub fn new(inner: R, chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::invalid_config("chunk size must be greater than zero"));
        }
        Ok(Self {
            inner,
            source: PathBuf::from("<stream>"),
            chunk_size,
            overlap,
            max_carry: chunk_size.max(overlap),
            previous: None,
            requested_carry: None,
            position: 0,
            finished: false,
        })
    }

    /// Upper bound on the carried prefix; never below `overlap`
    pub fn with_max_carry(mut self, max_carry: usize) -> Self {
        self.max_carry = max_carry.max(self.overlap);
        self
    }

    /// The configured overlap in bytes
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// The configured carry bound in bytes
    pub fn max_carry(&self) -> usize {
        self.max_carry
    }

    /// Absolute offset of the next byte to be read from the stream
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Requests that the next chunk re-presents the stream from `offset`
    /// onwards instead of only the trailing overlap. Offsets before the
    /// previous chunk are clamped to it.
    pub fn carry_from(&mut self, offset: u64) {
        self.requested_carry = Some(offset);
    }

    fn take_carry(&mut self) -> (Bytes, u64) {
        let Some(previous) = self.previous.take() else {
            return (Bytes::new(), self.position);
        };

        let end = previous.data.len();
        let mut start = match self.requested_carry.take() {
            Some(offset) => previous.index_of(offset),
            None => end.saturating_sub(self.overlap),
        };

        if end - start > self.max_carry {
            warn!(
                "{}: carry of {} bytes exceeds limit {}, truncating",
                self.source.display(),
                end - start,
                self.max_carry
            );
            start = end - self.max_carry;
        }

        let offset = previous.offset + start as u64;
        (previous.data.slice(start..), offset)
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.finished {
            return Ok(None);
        }

        let (carry, carry_offset) = self.take_carry();

        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(carry.len() + self.chunk_size)
            .map_err(|e| {
                Error::ResourceExhaustion(format!(
                    "cannot allocate {} byte chunk: {}",
                    carry.len() + self.chunk_size,
                    e
                ))
            })?;
        buf.extend_from_slice(&carry);
        let fresh = buf.len();

        let read = (&mut self.inner)
            .take(self.chunk_size as u64)
            .read_to_end(&mut buf)
            .map_err(|e| Error::file_read(&self.source, e))?;

        self.position += read as u64;
        let last = read < self.chunk_size;
        if last {
            self.finished = true;
        }

        if buf.is_empty() {
            trace!("{}: end of stream", self.source.display());
            return Ok(None);
        }

        if read == 0 && !carry.is_empty() {
            // The previous chunk ended exactly on a block boundary; hand the
            // carry back once more so deferred matches can be settled.
            trace!(
                "{}: flushing {} carried bytes at end of stream",
                self.source.display(),
                carry.len()
            );
        }

        debug!(
            "{}: chunk at {} ({} carried + {} fresh bytes{})",
            self.source.display(),
            carry_offset,
            fresh,
            read,
            if last { ", last" } else { "" }
        );

        let chunk = Chunk {
            data: Bytes::from(buf),
            offset: carry_offset,
            fresh,
            last,
        };
        self.previous = Some(chunk.clone());
        Ok(Some(chunk))
    }
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Seeks to `offset` before the first chunk is read
    pub fn resume_at(mut self, offset: u64) -> Result<Self> {
        if self.previous.is_some() || self.finished {
            return Err(Error::internal("resume_at called after reading started"));
        }
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::file_read(&self.source, e))?;
        self.position = offset;
        debug!("{}: resuming at offset {}", self.source.display(), offset);
        Ok(self)
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
