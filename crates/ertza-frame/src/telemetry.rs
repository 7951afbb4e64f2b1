//! Fixed-format telemetry lines sent back by physical drives.
//!
//! A line is 20 bytes: three `R<tag>` sub-tags each followed by a 4-byte
//! little-endian word, then `"\r\n"`. The first sub-tag (`RK`) doubles as
//! the line marker.
//!
//! ```text
//! ┌────┬──────────┬────┬──────────┬────┬──────────┬──────┐
//! │ RK │ ticks    │ RT │ turns    │ RS │ speed    │ \r\n │
//! │    │ i32 LE   │    │ f32 LE   │    │ f32 LE   │      │
//! └────┴──────────┴────┴──────────┴────┴──────────┴──────┘
//! ```

use bytes::{BufMut, BytesMut};

/// Length of one telemetry line.
pub const LINE_LENGTH: usize = 20;

/// Line marker, also the ticks sub-tag.
pub const MARKER: [u8; 2] = *b"RK";

const TICKS_TAG: [u8; 2] = *b"RK";
const TURNS_TAG: [u8; 2] = *b"RT";
const SPEED_TAG: [u8; 2] = *b"RS";
const LINE_END: [u8; 2] = *b"\r\n";
const ANCHOR: &[u8] = b"\r\nR";
const WORD_LENGTH: usize = 4;

/// One decoded telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub ticks: i32,
    pub turns: f32,
    pub speed: f32,
}

/// Locate the most recent complete line inside a raw read buffer.
///
/// The buffer is searched backwards for `"\r\nR"`; everything up to and
/// including that `"\r\n"` is kept and its last [`LINE_LENGTH`] bytes are
/// returned. Returns `None` when no anchor is found or too few bytes
/// precede it.
pub fn latest_line(buf: &[u8]) -> Option<&[u8]> {
    let pos = rfind(buf, ANCHOR)?;
    let line = &buf[..pos + LINE_END.len()];
    if line.len() < LINE_LENGTH {
        return None;
    }
    Some(&line[line.len() - LINE_LENGTH..])
}

/// Decode a telemetry line. Any missing tag or misplaced word yields `None`.
pub fn decode_telemetry(line: &[u8]) -> Option<Telemetry> {
    if line.len() != LINE_LENGTH {
        return None;
    }
    let start = find(line, &MARKER, 0)?;
    let frame = &line[start..];

    let ticks = word_between(frame, &TICKS_TAG, &TURNS_TAG)?;
    let turns = word_between(frame, &TURNS_TAG, &SPEED_TAG)?;
    let speed = word_between(frame, &SPEED_TAG, &LINE_END)?;

    Some(Telemetry {
        ticks: i32::from_le_bytes(ticks),
        turns: f32::from_le_bytes(turns),
        speed: f32::from_le_bytes(speed),
    })
}

/// Encode a sample as a telemetry line, as a drive would send it.
pub fn encode_telemetry(sample: &Telemetry, dst: &mut BytesMut) {
    dst.reserve(LINE_LENGTH);
    dst.put_slice(&TICKS_TAG);
    dst.put_i32_le(sample.ticks);
    dst.put_slice(&TURNS_TAG);
    dst.put_f32_le(sample.turns);
    dst.put_slice(&SPEED_TAG);
    dst.put_f32_le(sample.speed);
    dst.put_slice(&LINE_END);
}

// The closing tag is searched after the opening one so that word bytes
// equal to a tag further down cannot end the slice early.
fn word_between(frame: &[u8], tag: &[u8], next: &[u8]) -> Option<[u8; WORD_LENGTH]> {
    let begin = find(frame, tag, 0)? + tag.len();
    let end = find(frame, next, begin + WORD_LENGTH)?;
    frame[begin..end].try_into().ok()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sample: Telemetry) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_telemetry(&sample, &mut buf);
        buf.to_vec()
    }

    const SAMPLE: Telemetry = Telemetry {
        ticks: -1234,
        turns: 2.5,
        speed: 36.25,
    };

    #[test]
    fn well_formed_line_decodes_exactly() {
        let bytes = line(SAMPLE);
        assert_eq!(bytes.len(), LINE_LENGTH);
        assert_eq!(decode_telemetry(&bytes), Some(SAMPLE));
    }

    #[test]
    fn missing_sub_tag_is_no_value() {
        let mut bytes = line(SAMPLE);
        bytes[6] = b'X';
        assert_eq!(decode_telemetry(&bytes), None);
    }

    #[test]
    fn truncated_line_is_no_value() {
        let bytes = line(SAMPLE);
        assert_eq!(decode_telemetry(&bytes[..LINE_LENGTH - 1]), None);
    }

    #[test]
    fn missing_marker_is_no_value() {
        let mut bytes = line(SAMPLE);
        bytes[1] = b'Q';
        assert_eq!(decode_telemetry(&bytes), None);
    }

    #[test]
    fn latest_line_picks_last_complete_line() {
        let older = line(Telemetry {
            ticks: 1,
            turns: 0.0,
            speed: 0.0,
        });
        let newer = line(SAMPLE);
        let mut buf = b"\x00\x01".to_vec();
        buf.extend_from_slice(&older);
        buf.extend_from_slice(&newer);
        buf.extend_from_slice(b"RK\x01\x02");

        let found = latest_line(&buf).unwrap();
        assert_eq!(decode_telemetry(found), Some(SAMPLE));
    }

    #[test]
    fn latest_line_needs_a_following_line_start() {
        // The anchor is "\r\nR": a line is only taken once the next one begins.
        let bytes = line(SAMPLE);
        assert!(latest_line(&bytes).is_none());
    }

    #[test]
    fn latest_line_too_short() {
        assert!(latest_line(b"RK\x00\x00\r\nR").is_none());
    }
}
