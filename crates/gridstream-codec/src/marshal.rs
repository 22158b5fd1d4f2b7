use std::io::Write;

use bytes::BytesMut;

use crate::checksum::{Checksum, CHECKSUM_LEN};
use crate::error::{CodecError, Result};
use crate::scalar::{ByteOrder, Scalar};
use crate::varint;

/// Vector element data is staged in slabs of this size before hitting the
/// sink, so a write-behind sink can transmit one slab while the next is
/// encoded.
pub(crate) const VECTOR_SLAB: usize = 64 * 1024;

/// Data sections of vectors are padded to this boundary.
pub(crate) const VECTOR_ALIGN: usize = 4;

/// Encodes typed values onto a byte sink.
///
/// The sink may be a chunked stream, a socket or file, an in-memory buffer,
/// or a write-behind coordinator — the marshaller is agnostic. Every wire
/// byte is also fed to a running [`Checksum`] that callers can snapshot at
/// agreed checkpoints.
pub struct Marshaller<W> {
    sink: W,
    twiddle: bool,
    checksum: Checksum,
    /// Instance-owned staging buffer for vector element data.
    scratch: BytesMut,
}

impl<W: Write> Marshaller<W> {
    /// Create a marshaller producing `wire_order` bytes on the wire.
    ///
    /// The twiddle flag is derived by comparing wire and host order.
    pub fn new(sink: W, wire_order: ByteOrder) -> Self {
        Self::with_twiddle(sink, wire_order.needs_twiddle())
    }

    /// Create a marshaller with an explicit twiddle flag.
    pub fn with_twiddle(sink: W, twiddle: bool) -> Self {
        Self {
            sink,
            twiddle,
            checksum: Checksum::new(),
            scratch: BytesMut::new(),
        }
    }

    /// Whether multi-byte values are byte-swapped on the way out.
    pub fn twiddle(&self) -> bool {
        self.twiddle
    }

    pub fn put_byte(&mut self, value: u8) -> Result<()> {
        self.put_scalar(value)
    }

    pub fn put_i8(&mut self, value: i8) -> Result<()> {
        self.put_scalar(value)
    }

    pub fn put_i16(&mut self, value: i16) -> Result<()> {
        self.put_scalar(value)
    }

    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.put_scalar(value)
    }

    pub fn put_i32(&mut self, value: i32) -> Result<()> {
        self.put_scalar(value)
    }

    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.put_scalar(value)
    }

    pub fn put_i64(&mut self, value: i64) -> Result<()> {
        self.put_scalar(value)
    }

    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.put_scalar(value)
    }

    pub fn put_f32(&mut self, value: f32) -> Result<()> {
        self.put_scalar(value)
    }

    pub fn put_f64(&mut self, value: f64) -> Result<()> {
        self.put_scalar(value)
    }

    /// Write a varint length prefix followed by the string's UTF-8 bytes.
    ///
    /// Strings are not NUL-terminated on the wire.
    pub fn put_str(&mut self, value: &str) -> Result<()> {
        self.put_opaque(value.as_bytes())
    }

    /// URLs share the string wire form.
    pub fn put_url(&mut self, value: &str) -> Result<()> {
        self.put_str(value)
    }

    /// Write a varint length prefix followed by the raw bytes.
    pub fn put_opaque(&mut self, value: &[u8]) -> Result<()> {
        self.put_varint(value.len() as u64)?;
        self.emit(value)
    }

    /// Write a bare varint.
    pub fn put_varint(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; varint::MAX_GROUPS];
        let len = varint::encode(value, &mut buf);
        self.emit(&buf[..len])
    }

    /// Write a fixed vector: u32 element count, element data, zero padding to
    /// a 4-byte boundary.
    pub fn put_vector<T: Scalar>(&mut self, values: &[T]) -> Result<()> {
        let count = u32::try_from(values.len()).map_err(|_| CodecError::TooManyElements {
            count: values.len(),
        })?;
        self.put_scalar(count)?;
        self.put_elements(values)
    }

    /// Write a varying vector.
    ///
    /// The wire layout matches [`put_vector`](Self::put_vector); the element
    /// count travels on the wire, and the decoder takes it from there rather
    /// than from its caller.
    pub fn put_varying_vector<T: Scalar>(&mut self, values: &[T]) -> Result<()> {
        self.put_vector(values)
    }

    /// Snapshot the running checksum without resetting it.
    pub fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        self.checksum.snapshot()
    }

    /// The running checksum as 32 lowercase hex characters.
    pub fn checksum_hex(&self) -> String {
        self.checksum.snapshot_hex()
    }

    /// Restart checksum accumulation.
    pub fn reset_checksum(&mut self) {
        self.checksum.reset();
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(CodecError::Io)
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Consume the marshaller and return the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn put_scalar<T: Scalar>(&mut self, value: T) -> Result<()> {
        let wire = value.to_wire(self.twiddle);
        self.emit(wire.as_ref())
    }

    fn put_elements<T: Scalar>(&mut self, values: &[T]) -> Result<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();

        let mut outcome = Ok(());
        for value in values {
            scratch.extend_from_slice(value.to_wire(self.twiddle).as_ref());
            if scratch.len() >= VECTOR_SLAB {
                outcome = self.emit(&scratch);
                scratch.clear();
                if outcome.is_err() {
                    break;
                }
            }
        }
        if outcome.is_ok() {
            let data_len = values.len() * T::WIDTH;
            let pad = (VECTOR_ALIGN - data_len % VECTOR_ALIGN) % VECTOR_ALIGN;
            scratch.extend_from_slice(&[0u8; VECTOR_ALIGN - 1][..pad]);
            if !scratch.is_empty() {
                outcome = self.emit(&scratch);
                scratch.clear();
            }
        }

        self.scratch = scratch;
        outcome
    }

    /// The single choke point: every wire byte passes through here.
    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes)?;
        self.checksum.update(bytes);
        Ok(())
    }
}
