/// Errors raised by serial remotes.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] ertza_transport::TransportError),

    #[error("frame error: {0}")]
    Frame(#[from] ertza_frame::FrameError),

    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server is not running.
    #[error("serial server is not running")]
    NotRunning,

    /// Too many consecutive telemetry reads failed. Terminal for the link.
    #[error("link unreliable: {lost} consecutive failed reads (max {max})")]
    LinkUnreliable { lost: u32, max: u32 },

    /// The drive answered with something other than what was asked.
    #[error("unexpected reply: {0:?}")]
    UnexpectedReply(Vec<u8>),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
