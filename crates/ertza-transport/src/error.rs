/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {device}: {source}")]
    Open {
        device: String,
        source: serialport::Error,
    },

    /// Failed to apply a setting on an open device.
    #[error("failed to configure {device}: {source}")]
    Configure {
        device: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on the serial stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No device path was configured.
    #[error("no serial device configured")]
    NoDevice,
}

pub type Result<T> = std::result::Result<T, TransportError>;
