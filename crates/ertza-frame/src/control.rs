use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Control commands end with a single newline byte.
pub const CONTROL_TERMINATOR: u8 = b'\n';

/// At most four data bytes follow the command byte.
pub const MAX_CONTROL_DATA: usize = 4;

/// Data packed after a control command byte.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandData {
    /// No data: the command byte is followed directly by the terminator.
    Empty,
    /// Up to four raw bytes, sent as-is.
    Raw(Vec<u8>),
    /// 32-bit signed integer, big-endian.
    Int(i32),
    /// 32-bit float, big-endian.
    Float(f32),
}

impl CommandData {
    /// Number of data bytes this value occupies on the wire.
    pub fn wire_len(&self) -> usize {
        match self {
            CommandData::Empty => 0,
            CommandData::Raw(bytes) => bytes.len(),
            CommandData::Int(_) | CommandData::Float(_) => 4,
        }
    }
}

impl From<i32> for CommandData {
    fn from(value: i32) -> Self {
        CommandData::Int(value)
    }
}

impl From<f32> for CommandData {
    fn from(value: f32) -> Self {
        CommandData::Float(value)
    }
}

/// Encode an outbound control command.
///
/// Wire format:
/// ```text
/// ┌─────────┬─────────────┬──────┐
/// │ Cmd (1) │ Data (0..4) │ '\n' │
/// └─────────┴─────────────┴──────┘
/// ```
pub fn encode_control(command: u8, data: &CommandData, dst: &mut BytesMut) -> Result<()> {
    if data.wire_len() > MAX_CONTROL_DATA {
        return Err(FrameError::ControlDataTooLarge {
            size: data.wire_len(),
        });
    }

    dst.reserve(2 + data.wire_len());
    dst.put_u8(command);
    match data {
        CommandData::Empty => {}
        CommandData::Raw(bytes) => dst.put_slice(bytes),
        CommandData::Int(value) => dst.put_i32(*value),
        CommandData::Float(value) => dst.put_f32(*value),
    }
    dst.put_u8(CONTROL_TERMINATOR);
    Ok(())
}
