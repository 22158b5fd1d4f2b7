use bytes::Bytes;

use crate::error::{ChunkError, Result};

/// Chunk header: one big-endian u32 = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Maximum chunk payload size: the length field is 24 bits.
pub const MAX_CHUNK_SIZE: usize = 0x00FF_FFFF;

/// Mask selecting the chunk-kind bits of the header.
pub const KIND_MASK: u32 = 0x0300_0000;

/// Mask selecting the payload-length bits of the header.
pub const LENGTH_MASK: u32 = 0x00FF_FFFF;

/// Reserved header bit for out-of-band endianness signaling.
///
/// Never produced by this implementation; ignored on decode.
pub const BIG_ENDIAN_FLAG: u32 = 0x0400_0000;

const KIND_SHIFT: u32 = 24;

/// The three chunk kinds of the framing protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// An application data fragment.
    Data,
    /// Logical end-of-message; may carry a final fragment.
    End,
    /// A UTF-8 error message from the peer; terminates the stream.
    Error,
}

impl ChunkKind {
    fn wire_value(self) -> u32 {
        match self {
            ChunkKind::Data => 0x00,
            ChunkKind::End => 0x01,
            ChunkKind::Error => 0x02,
        }
    }
}

/// A decoded chunk.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// What this chunk signals.
    pub kind: ChunkKind,
    /// The chunk payload.
    pub payload: Bytes,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(kind: ChunkKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// The total wire size of this chunk (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a chunk header.
///
/// Wire format (big-endian u32):
/// ```text
/// ┌───────────────┬──────────────────────┐
/// │ Kind (byte 0) │ Length (bytes 1..4)  │
/// │ 0x00/01/02    │ 0 ..= 0x00FF_FFFF    │
/// └───────────────┴──────────────────────┘
/// ```
pub fn encode_header(kind: ChunkKind, length: usize) -> Result<[u8; 4]> {
    if length > MAX_CHUNK_SIZE {
        return Err(ChunkError::PayloadTooLarge {
            size: length,
            max: MAX_CHUNK_SIZE,
        });
    }
    let word = (kind.wire_value() << KIND_SHIFT) | length as u32;
    Ok(word.to_be_bytes())
}

/// Decode a chunk header.
///
/// Bits outside [`KIND_MASK`] and [`LENGTH_MASK`] (including
/// [`BIG_ENDIAN_FLAG`]) are ignored. Kind value 0x03 is unassigned.
pub fn decode_header(header: [u8; 4]) -> Result<(ChunkKind, usize)> {
    let word = u32::from_be_bytes(header);
    let kind = match (word & KIND_MASK) >> KIND_SHIFT {
        0x00 => ChunkKind::Data,
        0x01 => ChunkKind::End,
        0x02 => ChunkKind::Error,
        bits => return Err(ChunkError::UnknownKind { bits: bits as u8 }),
    };
    let length = (word & LENGTH_MASK) as usize;
    Ok((kind, length))
}
