use std::io::Read;

use bytes::BytesMut;

use crate::checksum::{Checksum, CHECKSUM_LEN};
use crate::error::{CodecError, Result};
use crate::marshal::{VECTOR_ALIGN, VECTOR_SLAB};
use crate::scalar::{ByteOrder, Scalar};
use crate::varint;

/// Decodes typed values from a byte source.
///
/// The mirror of [`Marshaller`](crate::Marshaller): same twiddle flag
/// selection, same running checksum over every wire byte consumed, so both
/// ends of a transfer can compare snapshots at agreed checkpoints.
pub struct Unmarshaller<R> {
    source: R,
    twiddle: bool,
    checksum: Checksum,
    scratch: BytesMut,
}

impl<R: Read> Unmarshaller<R> {
    /// Create an unmarshaller for a wire in `wire_order`.
    pub fn new(source: R, wire_order: ByteOrder) -> Self {
        Self::with_twiddle(source, wire_order.needs_twiddle())
    }

    /// Create an unmarshaller with an explicit twiddle flag.
    pub fn with_twiddle(source: R, twiddle: bool) -> Self {
        Self {
            source,
            twiddle,
            checksum: Checksum::new(),
            scratch: BytesMut::new(),
        }
    }

    /// Whether multi-byte values are byte-swapped on the way in.
    pub fn twiddle(&self) -> bool {
        self.twiddle
    }

    pub fn get_byte(&mut self) -> Result<u8> {
        self.get_scalar()
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        self.get_scalar()
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        self.get_scalar()
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        self.get_scalar()
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.get_scalar()
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.get_scalar()
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.get_scalar()
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.get_scalar()
    }

    pub fn get_f32(&mut self) -> Result<f32> {
        self.get_scalar()
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.get_scalar()
    }

    /// Read a varint-prefixed UTF-8 string.
    pub fn get_str(&mut self) -> Result<String> {
        let bytes = self.get_opaque()?;
        Ok(String::from_utf8(bytes)?)
    }

    /// URLs share the string wire form.
    pub fn get_url(&mut self) -> Result<String> {
        self.get_str()
    }

    /// Read a length-prefixed opaque blob, taking the length from the wire.
    pub fn get_opaque(&mut self) -> Result<Vec<u8>> {
        let length = self.get_varint()? as usize;
        let mut bytes = vec![0u8; length];
        self.fetch(&mut bytes)?;
        Ok(bytes)
    }

    /// Read an opaque blob whose length the caller already knows.
    ///
    /// The wire-declared length must equal `dest.len()`; on a mismatch the
    /// call fails before any byte is copied into `dest`.
    pub fn get_opaque_into(&mut self, dest: &mut [u8]) -> Result<()> {
        let declared = self.get_varint()? as usize;
        if declared != dest.len() {
            return Err(CodecError::SizeMismatch {
                expected: dest.len(),
                actual: declared,
            });
        }
        self.fetch(dest)
    }

    /// Read a bare varint.
    pub fn get_varint(&mut self) -> Result<u64> {
        let mut byte = [0u8; 1];
        varint::decode(|| {
            self.fetch(&mut byte)?;
            Ok(byte[0])
        })
    }

    /// Read a fixed vector of `expected` elements.
    ///
    /// The wire element count must agree with `expected`.
    pub fn get_vector<T: Scalar>(&mut self, expected: usize) -> Result<Vec<T>> {
        let count = self.get_scalar::<u32>()? as usize;
        if count != expected {
            return Err(CodecError::LengthMismatch {
                expected,
                actual: count,
            });
        }
        self.get_elements(count)
    }

    /// Read a varying vector, taking the element count from the wire.
    pub fn get_varying_vector<T: Scalar>(&mut self) -> Result<Vec<T>> {
        let count = self.get_scalar::<u32>()? as usize;
        self.get_elements(count)
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

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Consume the unmarshaller and return the source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn get_scalar<T: Scalar>(&mut self) -> Result<T> {
        let mut wire = [0u8; 8];
        self.fetch(&mut wire[..T::WIDTH])?;
        Ok(T::from_wire(&wire[..T::WIDTH], self.twiddle))
    }

    fn get_elements<T: Scalar>(&mut self, count: usize) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(count);
        let mut scratch = std::mem::take(&mut self.scratch);

        let outcome: Result<()> = (|| {
            let mut remaining = count;
            while remaining > 0 {
                let slab = remaining.min(VECTOR_SLAB / T::WIDTH);
                scratch.resize(slab * T::WIDTH, 0);
                self.fetch(&mut scratch)?;
                for chunk in scratch.chunks_exact(T::WIDTH) {
                    values.push(T::from_wire(chunk, self.twiddle));
                }
                remaining -= slab;
            }
            // Padding bytes are consumed but not validated.
            let data_len = count * T::WIDTH;
            let pad = (VECTOR_ALIGN - data_len % VECTOR_ALIGN) % VECTOR_ALIGN;
            if pad > 0 {
                scratch.resize(pad, 0);
                self.fetch(&mut scratch)?;
            }
            Ok(())
        })();

        scratch.clear();
        self.scratch = scratch;
        outcome?;
        Ok(values)
    }

    /// The single choke point: every wire byte passes through here.
    fn fetch(&mut self, dest: &mut [u8]) -> Result<()> {
        self.source.read_exact(dest)?;
        self.checksum.update(dest);
        Ok(())
    }
}
