use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::codec::{decode_header, ChunkKind, HEADER_SIZE};
use crate::error::{ChunkError, Result};

/// Reassembles the byte stream carried by a sequence of chunks.
///
/// Holds one chunk's payload at a time. DATA chunks are transparent; an END
/// chunk delivers any final bytes and then ends the stream; an ERROR chunk
/// records the peer's message and ends the stream immediately.
///
/// Malformed framing (unknown kind bits, a stream truncated mid-chunk) is
/// reported through [`has_error`](Self::has_error) after end-of-stream, not
/// as an `Err` — only underlying I/O failures are returned as errors.
pub struct ChunkedReader<R> {
    inner: R,
    /// Reassembly buffer; grows to the largest chunk seen.
    buf: Vec<u8>,
    pos: usize,
    end: usize,
    /// No further chunks follow (END or ERROR seen, or framing gave out).
    terminal: bool,
    error: Option<String>,
}

impl<R: Read> ChunkedReader<R> {
    /// Create a chunked reader over `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pos: 0,
            end: 0,
            terminal: false,
            error: None,
        }
    }

    /// Read up to `dest.len()` reassembled bytes.
    ///
    /// Drains the buffered chunk first, then reads whole subsequent chunks
    /// directly into `dest` until it is full or a terminal chunk is hit; a
    /// chunk that only partially fits is split and the remainder retained for
    /// the next call. Returns the number of bytes delivered; `0` means
    /// end-of-stream (check [`has_error`](Self::has_error)).
    pub fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        let mut copied = 0;
        loop {
            if self.pos < self.end {
                let n = (self.end - self.pos).min(dest.len() - copied);
                dest[copied..copied + n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
                self.pos += n;
                copied += n;
            }
            if copied == dest.len() || self.terminal {
                return Ok(copied);
            }

            let (kind, length) = match self.next_header()? {
                Some(decoded) => decoded,
                None => return Ok(copied),
            };
            match kind {
                ChunkKind::Data => {
                    let remaining = dest.len() - copied;
                    if length <= remaining {
                        // Whole chunk fits: bypass the reassembly buffer.
                        if self.fill_exact_slice(copied, length, dest)? {
                            copied += length;
                        }
                    } else {
                        if self.fill_exact_slice(copied, remaining, dest)? {
                            copied = dest.len();
                        }
                        if !self.terminal {
                            self.refill(length - remaining)?;
                        }
                    }
                }
                ChunkKind::End => {
                    self.terminal = true;
                    if length > 0 {
                        self.refill(length)?;
                    }
                }
                ChunkKind::Error => {
                    self.refill(length)?;
                    let message = String::from_utf8_lossy(&self.buf[self.pos..self.end]).into_owned();
                    debug!(message = %message, "received error chunk");
                    self.pos = 0;
                    self.end = 0;
                    self.set_error(message);
                    self.terminal = true;
                    return Ok(copied);
                }
            }
        }
    }

    /// Read a single reassembled byte; `None` at end-of-stream.
    pub fn get(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Whether the stream has delivered everything it ever will.
    pub fn is_eof(&self) -> bool {
        self.terminal && self.pos == self.end
    }

    /// Whether an ERROR chunk or malformed framing was observed.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The recorded error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read and decode the next chunk header.
    ///
    /// Returns `Ok(None)` when the framing is exhausted or malformed; in the
    /// malformed case the error flag is set first.
    fn next_header(&mut self) -> Result<Option<(ChunkKind, usize)>> {
        let mut header = [0u8; HEADER_SIZE];
        if !self.fill_exact(&mut header)? {
            return Ok(None);
        }
        match decode_header(header) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(err) => {
                self.set_error(err.to_string());
                self.terminal = true;
                Ok(None)
            }
        }
    }

    /// Replace the buffered payload with `length` bytes from the source.
    fn refill(&mut self, length: usize) -> Result<()> {
        if self.buf.len() < length {
            self.buf.resize(length, 0);
        }
        self.pos = 0;
        self.end = 0;
        let filled = {
            let mut slice = std::mem::take(&mut self.buf);
            let result = self.fill_exact(&mut slice[..length]);
            self.buf = slice;
            result?
        };
        if filled {
            self.end = length;
        }
        Ok(())
    }

    /// `fill_exact` into a sub-slice of `dest` starting at `offset`.
    fn fill_exact_slice(&mut self, offset: usize, length: usize, dest: &mut [u8]) -> Result<bool> {
        self.fill_exact(&mut dest[offset..offset + length])
    }

    /// Read exactly `dest.len()` bytes from the source.
    ///
    /// A stream that ends early is a framing defect: the error flag is set
    /// and `Ok(false)` returned. Other I/O failures propagate.
    fn fill_exact(&mut self, dest: &mut [u8]) -> Result<bool> {
        match self.inner.read_exact(dest) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                self.set_error("stream ended without end chunk".to_string());
                self.terminal = true;
                Ok(false)
            }
            Err(err) => Err(ChunkError::Io(err)),
        }
    }

    /// Record an error message; the first one sticks.
    fn set_error(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }
}

impl<R: Read> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        ChunkedReader::read(self, buf).map_err(|err| match err {
            ChunkError::Io(io) => io,
            other => std::io::Error::other(other),
        })
    }
}
