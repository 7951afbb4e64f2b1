use std::io::ErrorKind;

use bytes::BytesMut;
use ertza_frame::{decode_telemetry, encode_control, latest_line, CommandData, Telemetry};
use ertza_transport::{LinkStream, SerialStream};
use tracing::{debug, trace, warn};

use crate::config::ControlLinkConfig;
use crate::error::{RemoteError, Result};
use crate::speed::SpeedMapper;

/// Command byte asking a drive to identify itself.
pub const PRODUCT_INFO_COMMAND: u8 = b'R';

const MAX_REPLY_LENGTH: usize = 64;

/// Latest telemetry values with the tick count mapped to a speed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub ticks: i32,
    pub turns: f32,
    pub mapped_speed: f64,
}

/// Identification returned by a drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductInfo {
    pub product_id: u8,
    pub device_id: u8,
}

/// Client side of a physical drive link.
///
/// Sends control commands and polls fixed-format telemetry lines. A run of
/// `max_lost_data` consecutive failed polls makes the link unreliable; no
/// reconnection is attempted here.
pub struct SerialControlLink<T> {
    stream: T,
    config: ControlLinkConfig,
    mapper: SpeedMapper,
    lost_data: u32,
    last: Sample,
    out: BytesMut,
}

impl SerialControlLink<SerialStream> {
    /// Open the configured serial device.
    pub fn open(config: ControlLinkConfig) -> Result<Self> {
        let stream = SerialStream::open(&config.serial)?;
        Ok(Self::new(stream, config))
    }
}

impl<T: LinkStream> SerialControlLink<T> {
    pub fn new(stream: T, config: ControlLinkConfig) -> Self {
        let mapper = SpeedMapper::new(
            config.max_speed,
            config.min_speed,
            config.dead_zone,
            config.init_range,
        );
        Self {
            stream,
            config,
            mapper,
            lost_data: 0,
            last: Sample::default(),
            out: BytesMut::with_capacity(8),
        }
    }

    /// Send one control command.
    pub fn send_command(&mut self, command: u8, data: &CommandData) -> Result<()> {
        self.out.clear();
        encode_control(command, data, &mut self.out)?;
        trace!(command = %char::from(command), bytes = ?&self.out[..], "sending control command");
        self.stream.write_all(&self.out)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read up to `read_size` bytes and return the most recent telemetry line.
    ///
    /// Pending input is discarded once a line has been found so the next
    /// poll sees fresh data.
    pub fn read_latest_window(&mut self) -> Result<Option<Vec<u8>>> {
        let raw = self.read_up_to(self.config.read_size)?;
        let Some(line) = latest_line(&raw) else {
            debug!(size = raw.len(), "no telemetry line in read");
            return Ok(None);
        };
        let line = line.to_vec();
        self.stream.discard_input()?;
        Ok(Some(line))
    }

    /// Poll one telemetry sample. Undecodable data yields `None`.
    pub fn poll_telemetry(&mut self) -> Result<Option<Telemetry>> {
        Ok(self
            .read_latest_window()?
            .and_then(|line| decode_telemetry(&line)))
    }

    /// Poll telemetry, tracking consecutive failures.
    ///
    /// A failed poll returns the previous sample until `max_lost_data`
    /// failures in a row, which is reported as [`RemoteError::LinkUnreliable`].
    pub fn safe_get(&mut self) -> Result<Sample> {
        match self.poll_telemetry()? {
            Some(telemetry) => {
                self.lost_data = 0;
                self.last = Sample {
                    ticks: telemetry.ticks,
                    turns: telemetry.turns,
                    mapped_speed: self.mapper.map(i64::from(telemetry.ticks)),
                };
                Ok(self.last)
            }
            None => {
                self.lost_data += 1;
                warn!(lost = self.lost_data, "telemetry skipped");
                if self.lost_data >= self.config.max_lost_data {
                    return Err(RemoteError::LinkUnreliable {
                        lost: self.lost_data,
                        max: self.config.max_lost_data,
                    });
                }
                Ok(self.last)
            }
        }
    }

    /// Ask the drive for its product and device identifiers.
    pub fn product_info(&mut self) -> Result<ProductInfo> {
        self.send_command(PRODUCT_INFO_COMMAND, &CommandData::Empty)?;
        let reply = self.read_line()?;
        match reply.as_slice() {
            [PRODUCT_INFO_COMMAND, product_id, device_id, ..] => Ok(ProductInfo {
                product_id: *product_id,
                device_id: *device_id,
            }),
            _ => Err(RemoteError::UnexpectedReply(reply)),
        }
    }

    /// Map a tick count onto the configured speed range.
    pub fn map_to_speed(&mut self, ticks: i64) -> f64 {
        self.mapper.map(ticks)
    }

    /// Consecutive failed polls so far.
    pub fn lost_data(&self) -> u32 {
        self.lost_data
    }

    pub fn last_sample(&self) -> Sample {
        self.last
    }

    pub fn config(&self) -> &ControlLinkConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.stream
    }

    fn read_up_to(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    break
                }
                Err(err) => return Err(err.into()),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        while line.len() < MAX_REPLY_LENGTH {
            match self.stream.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    break
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(line)
    }
}
