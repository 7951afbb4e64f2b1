use std::borrow::Cow;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Declared length field: 2 bytes, big-endian.
pub const LENGTH_SIZE: usize = 2;

/// Every server frame ends with these two bytes.
pub const TERMINATOR: [u8; 2] = *b"\r\n";

/// Separates the path from its arguments, and arguments from each other.
pub const ARG_SEPARATOR: u8 = b':';

/// Appended to the path of a faulty frame to build its reply.
pub const ERROR_SUFFIX: &str = ".error";

/// Longest path echoed back in an error reply.
///
/// The path appears twice in the reply, so this keeps any reply well under
/// [`DEFAULT_MAX_DATA`].
pub const MAX_ECHOED_PATH: usize = 256;

/// Default maximum data size: 1 KiB.
///
/// Keeping the length below 0x0d00 guarantees the length field can never
/// start with a carriage return.
pub const DEFAULT_MAX_DATA: usize = 1024;

/// A terminated server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Length announced by the sender.
    pub declared_len: usize,
    /// `path[:arg]*` block, without length field or terminator.
    pub data: Bytes,
}

impl Frame {
    /// Create a frame whose declared length matches its data.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            declared_len: data.len(),
            data,
        }
    }

    /// Build a frame from a path and its arguments.
    pub fn from_parts<'a>(path: &str, args: impl IntoIterator<Item = &'a str>) -> Self {
        let mut data = BytesMut::from(path.as_bytes());
        for arg in args {
            data.put_u8(ARG_SEPARATOR);
            data.put_slice(arg.as_bytes());
        }
        Self::new(data.freeze())
    }

    /// The path part of the data block (everything before the first `:`).
    pub fn path(&self) -> Cow<'_, str> {
        let end = self
            .data
            .iter()
            .position(|b| *b == ARG_SEPARATOR)
            .unwrap_or(self.data.len());
        String::from_utf8_lossy(&self.data[..end])
    }

    /// Arguments following the path.
    pub fn args(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.data
            .split(|b| *b == ARG_SEPARATOR)
            .skip(1)
            .map(String::from_utf8_lossy)
    }

    /// True when the declared length matches the data.
    pub fn is_consistent(&self) -> bool {
        self.declared_len == self.data.len()
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        LENGTH_SIZE + self.data.len() + TERMINATOR.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────────┬────────────┐
/// │ Length (2B)  │ Data                 │ Terminator │
/// │ big-endian   │ path[:arg]*          │ "\r\n"     │
/// └──────────────┴──────────────────────┴────────────┘
/// ```
pub fn encode_frame(data: &[u8], dst: &mut BytesMut) -> Result<()> {
    if data.len() > u16::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: data.len(),
            max: u16::MAX as usize,
        });
    }
    dst.reserve(LENGTH_SIZE + data.len() + TERMINATOR.len());
    dst.put_u16(data.len() as u16);
    dst.put_slice(data);
    dst.put_slice(&TERMINATOR);
    Ok(())
}

/// Split the next terminated packet off the front of `src`.
///
/// The terminator search starts after the length field. Returns `None` if
/// no complete packet is buffered yet; the packet includes its terminator.
pub fn split_packet(src: &mut BytesMut) -> Option<BytesMut> {
    if src.len() < LENGTH_SIZE + TERMINATOR.len() {
        return None;
    }
    let pos = src[LENGTH_SIZE..]
        .windows(TERMINATOR.len())
        .position(|window| window == TERMINATOR)?;
    Some(src.split_to(LENGTH_SIZE + pos + TERMINATOR.len()))
}

/// Decode one terminated packet and check its declared length.
pub fn decode_packet(packet: &[u8]) -> Result<Frame> {
    if packet.len() < LENGTH_SIZE + TERMINATOR.len() {
        return Err(FrameError::Truncated { size: packet.len() });
    }

    let declared_len = u16::from_be_bytes([packet[0], packet[1]]) as usize;
    let data = &packet[LENGTH_SIZE..packet.len() - TERMINATOR.len()];
    let frame = Frame {
        declared_len,
        data: Bytes::copy_from_slice(data),
    };

    if !frame.is_consistent() {
        return Err(FrameError::LengthMismatch {
            path: frame.path().into_owned(),
            declared: declared_len,
            actual: frame.data.len(),
        });
    }
    Ok(frame)
}

/// Build the reply sent back for a frame whose length did not check out.
///
/// The reply keeps the subject with an `.error` suffix and names both lengths.
/// Paths longer than [`MAX_ECHOED_PATH`] bytes are cut so the reply always fits.
pub fn error_reply(path: &str, declared: usize, actual: usize) -> Frame {
    let path = clip(path, MAX_ECHOED_PATH);
    let subject = format!("{path}{ERROR_SUFFIX}");
    let message = format!("Invalid length specified in {path}: {declared} != {actual}");
    Frame::from_parts(&subject, [message.as_str()])
}

fn clip(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Configuration for the frame reader and writer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum data size in bytes. Default: 1 KiB.
    pub max_data_size: usize,
    /// Buffered bytes older than this are discarded before new bytes are appended.
    pub stale_after: Duration,
    /// Read timeout applied to serial streams.
    pub read_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_data_size: DEFAULT_MAX_DATA,
            stale_after: Duration::from_secs(1),
            read_timeout: Some(Duration::from_secs(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(data: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(data, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_encode_layout() {
        let buf = wire(b"machine/set:velocity_ref:3.0");
        assert_eq!(&buf[..2], &[0x00, 28]);
        assert_eq!(&buf[2..30], b"machine/set:velocity_ref:3.0");
        assert_eq!(&buf[30..], b"\r\n");
    }

    #[test]
    fn test_split_and_decode() {
        let mut buf = wire(b"machine/get:torque_ref");
        let packet = split_packet(&mut buf).unwrap();
        let frame = decode_packet(&packet).unwrap();

        assert_eq!(frame.path(), "machine/get");
        assert_eq!(frame.args().collect::<Vec<_>>(), vec!["torque_ref"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_split_incomplete() {
        let mut buf = wire(b"alive");
        buf.truncate(buf.len() - 1);
        assert!(split_packet(&mut buf).is_none());
        assert_eq!(buf.len(), 2 + 5 + 1);
    }

    #[test]
    fn test_terminator_inside_length_field_is_ignored() {
        // A declared length of 0x0d0a must not be mistaken for a terminator.
        let mut buf = BytesMut::from(&b"\r\nabc\r\n"[..]);
        let packet = split_packet(&mut buf).unwrap();
        assert_eq!(packet.len(), 7);
    }

    #[test]
    fn test_length_mismatch_names_both_lengths() {
        let mut buf = BytesMut::new();
        buf.put_u16(9);
        buf.put_slice(b"machine/go");
        buf.put_slice(&TERMINATOR);

        let packet = split_packet(&mut buf).unwrap();
        let err = decode_packet(&packet).unwrap_err();
        match err {
            FrameError::LengthMismatch {
                path,
                declared,
                actual,
            } => {
                assert_eq!(path, "machine/go");
                assert_eq!(declared, 9);
                assert_eq!(actual, 10);
            }
            other => panic!("expected length mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_packet() {
        let err = decode_packet(b"\r\n").unwrap_err();
        assert!(matches!(err, FrameError::Truncated { size: 2 }));
    }

    #[test]
    fn test_error_reply_subject_and_body() {
        let reply = error_reply("machine/set", 12, 14);
        assert_eq!(reply.path(), "machine/set.error");
        let body: Vec<_> = reply.args().collect();
        assert_eq!(body, vec!["Invalid length specified in machine/set", " 12 != 14"]);
        assert!(reply.is_consistent());
    }

    #[test]
    fn test_error_reply_for_long_path_fits() {
        let path = "p".repeat(600);
        let reply = error_reply(&path, 1, 600);

        assert!(reply.data.len() <= DEFAULT_MAX_DATA);
        assert_eq!(reply.path(), format!("{}.error", "p".repeat(MAX_ECHOED_PATH)));
        let body: Vec<_> = reply.args().collect();
        assert_eq!(body[1], " 1 != 600");
    }

    #[test]
    fn test_clip_keeps_char_boundary() {
        assert_eq!(clip("abc", 8), "abc");
        assert_eq!(clip("aé", 2), "a");
    }

    #[test]
    fn test_frame_from_parts() {
        let frame = Frame::from_parts("slave/set", ["velocity_ref", "6"]);
        assert_eq!(frame.data.as_ref(), b"slave/set:velocity_ref:6");
        assert_eq!(frame.wire_size(), 2 + 24 + 2);
    }

    #[test]
    fn test_multiple_packets_in_one_buffer() {
        let mut buf = wire(b"first");
        buf.extend_from_slice(&wire(b"second"));

        let f1 = decode_packet(&split_packet(&mut buf).unwrap()).unwrap();
        let f2 = decode_packet(&split_packet(&mut buf).unwrap()).unwrap();
        assert_eq!(f1.data.as_ref(), b"first");
        assert_eq!(f2.data.as_ref(), b"second");
        assert!(split_packet(&mut buf).is_none());
    }
}
