//! Typed value marshalling for the gridstream wire protocol.
//!
//! Converts scalars, strings, opaque blobs, and vectors between in-memory
//! form and a byte stream:
//! - Multi-byte values are "twiddled" (byte-swapped) when wire and host
//!   endianness differ
//! - Strings and opaques carry a base-128 varint length prefix
//! - Vectors carry a u32 element count and are padded to a 4-byte boundary
//! - A running 128-bit checksum covers every wire byte in each direction
//!
//! The codec reads and writes through `std::io::{Read, Write}`, so the byte
//! stream may be a chunked stream, a socket, a file, or an in-memory buffer.
//! For large payloads, [`WriteBehind`] overlaps encoding with transmission by
//! handing finished buffers to a background writer.

pub mod checksum;
pub mod error;
pub mod marshal;
pub mod scalar;
pub mod unmarshal;
pub mod varint;
pub mod write_behind;

pub use checksum::{Checksum, CHECKSUM_LEN};
pub use error::{CodecError, Result};
pub use marshal::Marshaller;
pub use scalar::{ByteOrder, Scalar};
pub use unmarshal::Unmarshaller;
pub use write_behind::WriteBehind;
