use std::io::{Read, Write};

use crate::stream::SerialStream;

/// A bidirectional byte link to a drive.
///
/// Implemented by [`SerialStream`] and by socket pairs used in simulators
/// and tests.
pub trait LinkStream: Read + Write + Send {
    /// Discard bytes received but not yet read. No-op where unsupported.
    fn discard_input(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LinkStream for SerialStream {
    fn discard_input(&mut self) -> std::io::Result<()> {
        self.clear_input().map_err(|err| match err {
            crate::TransportError::Io(io) => io,
            other => std::io::Error::other(other.to_string()),
        })
    }
}

#[cfg(unix)]
impl LinkStream for std::os::unix::net::UnixStream {}

impl<T: LinkStream + ?Sized> LinkStream for Box<T> {
    fn discard_input(&mut self) -> std::io::Result<()> {
        (**self).discard_input()
    }
}
