use std::io::Write;
use std::sync::{Mutex, PoisonError};

use ertza_frame::{Frame, FrameWriter};
use ertza_machine::{RemoteSendError, SlaveRemote, Value};
use tracing::trace;

/// Path of frames carrying a forwarded value.
pub const SLAVE_SET_PATH: &str = "slave/set";

/// A slave drive reached through a command-frame writer.
///
/// Each forwarded value is sent as a `slave/set:<key>:<value>` frame.
pub struct SerialSlave<W> {
    serial: String,
    writer: Mutex<FrameWriter<W>>,
}

impl<W: Write + Send> SerialSlave<W> {
    pub fn new(serial: impl Into<String>, writer: W) -> Self {
        Self {
            serial: serial.into(),
            writer: Mutex::new(FrameWriter::new(writer)),
        }
    }

    /// Consume the slave and return its writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_inner()
    }
}

impl<W: Write + Send> SlaveRemote for SerialSlave<W> {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn set_to_remote(&self, key: &str, value: &Value) -> Result<(), RemoteSendError> {
        let value = value.to_string();
        let frame = Frame::from_parts(SLAVE_SET_PATH, [key, value.as_str()]);
        trace!(serial = %self.serial, %key, %value, "sending to slave");
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_frame(&frame)
            .map_err(|err| RemoteSendError(err.to_string()))
    }
}
