//! Self-delimiting chunk framing for streamed scientific data.
//!
//! Every chunk carries a 4-byte big-endian header:
//! - The top byte selects the kind: DATA (0x00), END (0x01), ERROR (0x02)
//! - The low 3 bytes carry the payload length (max 16 MiB - 1)
//!
//! DATA chunks carry application fragments, END marks logical
//! end-of-message (optionally with a final fragment), and ERROR carries a
//! UTF-8 message from the peer and terminates the stream.
//!
//! No partial chunks, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_header, encode_header, Chunk, ChunkKind, BIG_ENDIAN_FLAG, HEADER_SIZE, KIND_MASK,
    LENGTH_MASK, MAX_CHUNK_SIZE,
};
pub use error::{ChunkError, Result};
pub use reader::ChunkedReader;
pub use writer::{ChunkedWriter, DEFAULT_CHUNK_SIZE};
