/// Errors that can occur while marshalling or unmarshalling values.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error on the underlying sink or source.
    #[error("codec I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An opaque read whose declared length disagrees with the wire length.
    #[error("opaque size mismatch (expected {expected} bytes, wire declares {actual})")]
    SizeMismatch { expected: usize, actual: usize },

    /// A fixed vector whose wire element count disagrees with the caller's.
    #[error("vector length mismatch (expected {expected} elements, wire declares {actual})")]
    LengthMismatch { expected: usize, actual: usize },

    /// A vector too large for the 32-bit wire element count.
    #[error("vector has too many elements ({count}) for the wire count field")]
    TooManyElements { count: usize },

    /// A varint whose continuation bytes exceed the 64-bit accumulator.
    #[error("varint length prefix overflows 64 bits")]
    VarintOverflow,

    /// A string field that is not valid UTF-8.
    #[error("string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A failure recorded by the background writer.
    #[error("background write failed: {0}")]
    BackgroundWrite(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
