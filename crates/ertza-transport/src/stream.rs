use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::settings::SerialSettings;

/// An open serial device — implements Read + Write.
///
/// Reads block for at most the configured timeout and then fail with
/// `ErrorKind::TimedOut`; callers treat that as "no bytes yet".
pub struct SerialStream {
    device: String,
    port: Box<dyn SerialPort>,
}

impl SerialStream {
    /// Open the device described by `settings` (8N1, no flow control).
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let device = settings.device.clone().ok_or(TransportError::NoDevice)?;

        let mut port = serialport::new(device.as_str(), settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                device: device.clone(),
                source,
            })?;

        let configure = |source: serialport::Error| TransportError::Configure {
            device: device.clone(),
            source,
        };
        if settings.rts {
            port.write_request_to_send(true).map_err(&configure)?;
        }
        if settings.dtr {
            port.write_data_terminal_ready(true).map_err(&configure)?;
        }

        debug!(%device, baud_rate = settings.baud_rate, "opened serial device");
        Ok(Self { device, port })
    }

    /// Device path this stream was opened on.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Change the blocking read timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|source| TransportError::Configure {
                device: self.device.clone(),
                source,
            })
    }

    /// Current blocking read timeout.
    pub fn timeout(&self) -> Duration {
        self.port.timeout()
    }

    /// Number of bytes waiting in the input buffer.
    pub fn bytes_to_read(&self) -> Result<u32> {
        self.port
            .bytes_to_read()
            .map_err(|err| TransportError::Io(err.into()))
    }

    /// Discard everything waiting in the input buffer.
    pub fn clear_input(&self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|err| TransportError::Io(err.into()))
    }

    /// Try to clone this stream (a second handle on the same device).
    ///
    /// Used to split a device into an independent reader and writer.
    pub fn try_clone(&self) -> Result<Self> {
        let port = self
            .port
            .try_clone()
            .map_err(|source| TransportError::Configure {
                device: self.device.clone(),
                source,
            })?;
        Ok(Self {
            device: self.device.clone(),
            port,
        })
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("device", &self.device)
            .finish()
    }
}
