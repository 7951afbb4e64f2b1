/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The declared length of a packet disagrees with its data.
    #[error("invalid length specified in {path}: {declared} != {actual}")]
    LengthMismatch {
        path: String,
        declared: usize,
        actual: usize,
    },

    /// A terminated packet too short to hold a length field.
    #[error("truncated packet ({size} bytes)")]
    Truncated { size: usize },

    /// The data block exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Control commands carry at most four data bytes.
    #[error("control data too large ({size} bytes, max 4)")]
    ControlDataTooLarge { size: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached end of file.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
