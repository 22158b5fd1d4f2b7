//! Wire-level transport for scientific data access.
//!
//! gridstream carries typed, possibly large, values over a transport-agnostic
//! byte channel using self-delimiting chunks with integrity checks and
//! explicit error signaling.
//!
//! # Crate Structure
//!
//! - [`chunk`] — DATA/END/ERROR chunk framing over any `Read`/`Write` stream
//! - [`codec`] — typed value marshalling with endianness correction, running
//!   checksums, and the write-behind coordinator

/// Re-export chunk framing types.
pub mod chunk {
    pub use gridstream_chunk::*;
}

/// Re-export value codec types.
pub mod codec {
    pub use gridstream_codec::*;
}
