use std::fmt;
use std::io;

use ertza_frame::FrameError;
use ertza_remote::RemoteError;
use ertza_transport::TransportError;

// Exit codes follow sysexits where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const CONFIG_INVALID: i32 = 78;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(CONFIG_INVALID, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::NoDevice => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::ControlDataTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn remote_error(context: &str, err: RemoteError) -> CliError {
    match err {
        RemoteError::Transport(err) => transport_error(context, err),
        RemoteError::Frame(err) => frame_error(context, err),
        RemoteError::Io(err) => io_error(context, err),
        RemoteError::LinkUnreliable { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        RemoteError::UnexpectedReply(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        RemoteError::NotRunning => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_is_a_usage_error() {
        let err = remote_error("open server", RemoteError::Transport(TransportError::NoDevice));
        assert_eq!(err.code, USAGE);
        assert_eq!(err.message, "open server: no serial device configured");
    }

    #[test]
    fn unreliable_link_is_a_transport_failure() {
        let err = remote_error("monitor", RemoteError::LinkUnreliable { lost: 10, max: 10 });
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn io_kinds_map_to_codes() {
        let denied = io_error("open", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.code, PERMISSION_DENIED);
        let timeout = frame_error("read", FrameError::Io(io::ErrorKind::TimedOut.into()));
        assert_eq!(timeout.code, TIMEOUT);
    }
}
