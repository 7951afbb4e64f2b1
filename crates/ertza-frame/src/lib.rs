//! Serial wire formats for ertza drive links.
//!
//! Two protocols share this crate:
//!
//! - The server-side command protocol: every frame is a 2-byte big-endian
//!   declared length, a `path[:arg]*` data block and a `"\r\n"` terminator.
//!   Frames whose declared length disagrees with their data are answered
//!   with a `.error` reply and never delivered.
//! - The client-side control protocol spoken to physical drives: one command
//!   byte, up to four data bytes and a newline out; fixed 20-byte telemetry
//!   lines (ticks, turns, speed) in.

pub mod codec;
pub mod control;
pub mod error;
pub mod reader;
pub mod telemetry;
pub mod writer;

pub use codec::{
    decode_packet, encode_frame, error_reply, split_packet, Frame, FrameConfig, ARG_SEPARATOR,
    DEFAULT_MAX_DATA, ERROR_SUFFIX, LENGTH_SIZE, MAX_ECHOED_PATH, TERMINATOR,
};
pub use control::{encode_control, CommandData, CONTROL_TERMINATOR, MAX_CONTROL_DATA};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use telemetry::{decode_telemetry, encode_telemetry, latest_line, Telemetry, LINE_LENGTH};
pub use writer::FrameWriter;
