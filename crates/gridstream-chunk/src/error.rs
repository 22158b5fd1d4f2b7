/// Errors that can occur during chunk encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The payload exceeds the 24-bit chunk length field.
    #[error("chunk payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The requested buffer capacity is zero or exceeds the chunk length field.
    #[error("invalid chunk buffer capacity ({got}, expected 1..={max})")]
    InvalidCapacity { got: usize, max: usize },

    /// The header carries an unassigned chunk-kind value.
    #[error("unknown chunk kind bits 0x{bits:02x}")]
    UnknownKind { bits: u8 },

    /// An I/O error occurred while reading or writing chunks.
    #[error("chunk I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete chunk was transferred.
    #[error("connection closed (incomplete chunk)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, ChunkError>;
