use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::codec::{encode_header, ChunkKind, MAX_CHUNK_SIZE};
use crate::error::{ChunkError, Result};

/// Default chunk payload capacity.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Writes a byte stream to any `Write` sink as a sequence of chunks.
///
/// Bytes are buffered up to the configured capacity; a full buffer is
/// emitted automatically as one DATA chunk. [`close`](Self::close) (or drop)
/// always emits a final END chunk, and [`write_error`](Self::write_error)
/// replaces anything still buffered with a single ERROR chunk.
#[derive(Debug)]
pub struct ChunkedWriter<W: Write> {
    inner: W,
    buf: BytesMut,
    capacity: usize,
    closed: bool,
}

impl<W: Write> ChunkedWriter<W> {
    /// Create a chunked writer with the default chunk capacity.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(DEFAULT_CHUNK_SIZE),
            capacity: DEFAULT_CHUNK_SIZE,
            closed: false,
        }
    }

    /// Create a chunked writer with an explicit chunk capacity.
    ///
    /// The capacity must fit the 24-bit chunk length field and be non-zero.
    pub fn with_capacity(inner: W, capacity: usize) -> Result<Self> {
        if capacity == 0 || capacity > MAX_CHUNK_SIZE {
            return Err(ChunkError::InvalidCapacity {
                got: capacity,
                max: MAX_CHUNK_SIZE,
            });
        }
        Ok(Self {
            inner,
            buf: BytesMut::with_capacity(capacity),
            capacity,
            closed: false,
        })
    }

    /// Buffer bytes for transmission, emitting DATA chunks as the buffer fills.
    pub fn write(&mut self, mut bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(ChunkError::ConnectionClosed);
        }
        while !bytes.is_empty() {
            let take = (self.capacity - self.buf.len()).min(bytes.len());
            self.buf.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.buf.len() == self.capacity {
                self.emit(ChunkKind::Data)?;
            }
        }
        Ok(())
    }

    /// Emit any buffered bytes as one DATA chunk; no-op if nothing is buffered.
    pub fn flush(&mut self) -> Result<()> {
        if self.closed {
            return Err(ChunkError::ConnectionClosed);
        }
        if !self.buf.is_empty() {
            self.emit(ChunkKind::Data)?;
        }
        self.flush_inner()
    }

    /// Emit an END chunk carrying any buffered bytes (zero-length if none).
    ///
    /// The stream is terminal afterwards; a second call is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.emit(ChunkKind::End)?;
        self.closed = true;
        self.flush_inner()
    }

    /// Discard buffered bytes and emit one ERROR chunk carrying `message`.
    ///
    /// The stream is terminal afterwards.
    pub fn write_error(&mut self, message: &str) -> Result<()> {
        if self.closed {
            return Err(ChunkError::ConnectionClosed);
        }
        debug!(discarded = self.buf.len(), "emitting error chunk");
        self.buf.clear();
        self.buf.extend_from_slice(message.as_bytes());
        self.emit(ChunkKind::Error)?;
        self.closed = true;
        self.flush_inner()
    }

    /// The configured chunk payload capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    ///
    /// Writing to the sink directly interleaves bytes with chunk framing;
    /// callers are expected to flush first.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Write the buffered payload as one chunk of `kind` and clear the buffer.
    fn emit(&mut self, kind: ChunkKind) -> Result<()> {
        let header = encode_header(kind, self.buf.len())?;
        write_all_retry(&mut self.inner, &header)?;
        write_all_retry(&mut self.inner, &self.buf)?;
        self.buf.clear();
        Ok(())
    }

    fn flush_inner(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ChunkError::Io(err)),
            }
        }
    }
}

impl<W: Write> Drop for ChunkedWriter<W> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.close() {
                warn!(error = %err, "failed to emit end chunk on drop");
            }
        }
    }
}

impl<W: Write> Write for ChunkedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        ChunkedWriter::write(self, buf).map_err(into_io_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        ChunkedWriter::flush(self).map_err(into_io_error)
    }
}

fn write_all_retry<W: Write>(inner: &mut W, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        match inner.write(bytes) {
            Ok(0) => return Err(ChunkError::ConnectionClosed),
            Ok(n) => bytes = &bytes[n..],
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(ChunkError::Io(err)),
        }
    }
    Ok(())
}

fn into_io_error(err: ChunkError) -> std::io::Error {
    match err {
        ChunkError::Io(io) => io,
        other => std::io::Error::other(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_header, HEADER_SIZE};

    fn decode_chunks(mut wire: &[u8]) -> Vec<(ChunkKind, Vec<u8>)> {
        let mut chunks = Vec::new();
        while !wire.is_empty() {
            let header: [u8; 4] = wire[..HEADER_SIZE].try_into().unwrap();
            let (kind, len) = decode_header(header).unwrap();
            wire = &wire[HEADER_SIZE..];
            chunks.push((kind, wire[..len].to_vec()));
            wire = &wire[len..];
        }
        chunks
    }

    #[test]
    fn write_buffers_until_flush() {
        let mut wire = Vec::new();
        let mut writer = ChunkedWriter::new(&mut wire);

        writer.write(b"hello").unwrap();
        assert!(writer.get_ref().is_empty());

        writer.flush().unwrap();
        writer.close().unwrap();
        drop(writer);

        let chunks = decode_chunks(&wire);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], (ChunkKind::Data, b"hello".to_vec()));
        assert_eq!(chunks[1], (ChunkKind::End, Vec::new()));
    }

    #[test]
    fn empty_flush_is_a_no_op() {
        let mut wire = Vec::new();
        let mut writer = ChunkedWriter::new(&mut wire);
        writer.flush().unwrap();
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn full_buffer_emits_data_chunk_automatically() {
        let mut wire = Vec::new();
        let mut writer = ChunkedWriter::with_capacity(&mut wire, 4).unwrap();

        writer.write(b"0123456789").unwrap();
        writer.close().unwrap();
        drop(writer);

        let chunks = decode_chunks(&wire);
        assert_eq!(chunks[0], (ChunkKind::Data, b"0123".to_vec()));
        assert_eq!(chunks[1], (ChunkKind::Data, b"4567".to_vec()));
        assert_eq!(chunks[2], (ChunkKind::End, b"89".to_vec()));
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn close_right_after_construction_emits_one_empty_end_chunk() {
        let mut wire = Vec::new();
        let mut writer = ChunkedWriter::new(&mut wire);
        writer.close().unwrap();
        drop(writer);

        let chunks = decode_chunks(&wire);
        assert_eq!(chunks, vec![(ChunkKind::End, Vec::new())]);
    }

    #[test]
    fn drop_emits_end_chunk() {
        let mut wire = Vec::new();
        {
            let mut writer = ChunkedWriter::new(&mut wire);
            writer.write(b"tail").unwrap();
        }
        let chunks = decode_chunks(&wire);
        assert_eq!(chunks, vec![(ChunkKind::End, b"tail".to_vec())]);
    }

    #[test]
    fn close_twice_emits_end_once() {
        let mut wire = Vec::new();
        let mut writer = ChunkedWriter::new(&mut wire);
        writer.close().unwrap();
        writer.close().unwrap();
        drop(writer);

        assert_eq!(decode_chunks(&wire).len(), 1);
    }

    #[test]
    fn write_error_discards_buffered_bytes() {
        let mut wire = Vec::new();
        let mut writer = ChunkedWriter::new(&mut wire);

        writer.write(b"not sent").unwrap();
        writer.write_error("boom").unwrap();
        drop(writer);

        let chunks = decode_chunks(&wire);
        assert_eq!(chunks, vec![(ChunkKind::Error, b"boom".to_vec())]);
    }

    #[test]
    fn write_after_close_is_rejected() {
        let mut wire = Vec::new();
        let mut writer = ChunkedWriter::new(&mut wire);
        writer.close().unwrap();

        let err = writer.write(b"late").unwrap_err();
        assert!(matches!(err, ChunkError::ConnectionClosed));
    }

    #[test]
    fn invalid_capacity_rejected() {
        let err = ChunkedWriter::with_capacity(Vec::new(), 0).unwrap_err();
        assert!(matches!(err, ChunkError::InvalidCapacity { .. }));

        let err = ChunkedWriter::with_capacity(Vec::new(), MAX_CHUNK_SIZE + 1).unwrap_err();
        assert!(matches!(err, ChunkError::InvalidCapacity { .. }));
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = ChunkedWriter::new(ZeroWriter);
        writer.write(b"x").unwrap();
        let err = writer.flush().unwrap_err();
        assert!(matches!(err, ChunkError::ConnectionClosed));
        // Avoid a second failing END write from Drop.
        writer.closed = true;
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let sink = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };
        let mut writer = ChunkedWriter::new(sink);

        writer.write(b"retry").unwrap();
        writer.flush().unwrap();

        assert!(!writer.get_ref().data.is_empty());
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
