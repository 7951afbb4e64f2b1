use std::io::{ErrorKind, Read};
use std::time::Instant;

use bytes::BytesMut;
use ertza_transport::SerialStream;
use tracing::{debug, trace};

use crate::codec::{decode_packet, split_packet, Frame, FrameConfig, LENGTH_SIZE, TERMINATOR};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 2 * 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads terminated frames from any `Read` stream.
///
/// Each call to [`FrameReader::read_frames`] performs one read and then
/// drains every complete packet out of the buffer. Bytes left in the buffer
/// longer than `stale_after` are dropped before new bytes are appended, so
/// unrelated partial packets are never stitched together.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    last_read: Option<Instant>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            last_read: None,
        }
    }

    /// Read once from the stream and return every packet now complete.
    ///
    /// Each entry is either a checked frame or the fault found in that
    /// packet. A read timeout yields an empty batch. Returns
    /// `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frames(&mut self) -> Result<Vec<Result<Frame>>> {
        self.fill()?;
        Ok(self.drain())
    }

    /// Extract every complete packet currently buffered.
    pub fn drain(&mut self) -> Vec<Result<Frame>> {
        let mut frames = Vec::new();
        while let Some(packet) = split_packet(&mut self.buf) {
            trace!(size = packet.len(), "extracted packet");
            frames.push(decode_packet(&packet));
        }

        let limit = LENGTH_SIZE + self.config.max_data_size + TERMINATOR.len();
        if self.buf.len() > limit {
            debug!(size = self.buf.len(), "discarding unterminated data");
            frames.push(Err(FrameError::PayloadTooLarge {
                size: self.buf.len(),
                max: limit,
            }));
            self.buf.clear();
        }
        frames
    }

    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    break 0
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        };

        let now = Instant::now();
        if let Some(last) = self.last_read {
            if now.duration_since(last) > self.config.stale_after && !self.buf.is_empty() {
                debug!(size = self.buf.len(), "dropping stale buffered data");
                self.buf.clear();
            }
        }
        self.last_read = Some(now);
        self.buf.extend_from_slice(&chunk[..read]);
        Ok(read)
    }

    /// Number of bytes waiting for a terminator.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<SerialStream> {
    /// Create a frame reader for a serial device and apply the read timeout from config.
    pub fn with_config_serial(mut inner: SerialStream, config: FrameConfig) -> Result<Self> {
        if let Some(timeout) = config.read_timeout {
            inner
                .set_timeout(timeout)
                .map_err(transport_to_frame_error)?;
        }
        Ok(Self::with_config(inner, config))
    }
}

fn transport_to_frame_error(err: ertza_transport::TransportError) -> FrameError {
    match err {
        ertza_transport::TransportError::Io(io) => FrameError::Io(io),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::encode_frame;

    fn wire(data: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(data, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(b"machine/get:velocity_ref")));
        let frames = reader.read_frames().unwrap();

        assert_eq!(frames.len(), 1);
        let frame = frames[0].as_ref().unwrap();
        assert_eq!(frame.path(), "machine/get");
    }

    #[test]
    fn drains_every_packet_of_one_read() {
        let mut bytes = wire(b"one");
        bytes.extend(wire(b"two"));
        bytes.extend(wire(b"three"));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frames = reader.read_frames().unwrap();

        let data: Vec<_> = frames
            .into_iter()
            .map(|f| f.unwrap().data.to_vec())
            .collect();
        assert_eq!(data, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn faulty_packet_does_not_hide_neighbours() {
        let mut bytes = wire(b"first");
        let mut bad = BytesMut::new();
        bad.put_u16(40);
        bad.put_slice(b"machine/set:x\r\n");
        bytes.extend_from_slice(&bad);
        bytes.extend(wire(b"last"));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frames = reader.read_frames().unwrap();

        assert_eq!(frames.len(), 3);
        assert!(frames[0].is_ok());
        assert!(matches!(
            frames[1],
            Err(FrameError::LengthMismatch {
                declared: 40,
                actual: 13,
                ..
            })
        ));
        assert_eq!(frames[2].as_ref().unwrap().data.as_ref(), b"last");
    }

    #[test]
    fn partial_read_handling() {
        let bytes = wire(b"slow");
        let mut reader = FrameReader::new(ByteByByteReader { bytes, pos: 0 });

        let mut frames = Vec::new();
        while frames.is_empty() {
            frames = reader.read_frames().unwrap();
        }
        assert_eq!(frames[0].as_ref().unwrap().data.as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frames().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn timeout_yields_empty_batch() {
        let mut reader = FrameReader::new(ScriptedReader::new(vec![Err(ErrorKind::TimedOut)]));
        assert!(reader.read_frames().unwrap().is_empty());

        let mut reader = FrameReader::new(ScriptedReader::new(vec![Err(ErrorKind::WouldBlock)]));
        assert!(reader.read_frames().unwrap().is_empty());
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = ScriptedReader::new(vec![Err(ErrorKind::Interrupted), Ok(wire(b"ok"))]);
        let mut framed = FrameReader::new(reader);
        let frames = framed.read_frames().unwrap();
        assert_eq!(frames[0].as_ref().unwrap().data.as_ref(), b"ok");
    }

    #[test]
    fn other_io_errors_propagate() {
        let mut framed = FrameReader::new(ScriptedReader::new(vec![Err(ErrorKind::BrokenPipe)]));
        let err = framed.read_frames().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn stale_partial_packet_is_discarded() {
        let bytes = wire(b"machine/go");
        let (head, tail) = bytes.split_at(5);
        let reader = ScriptedReader::new(vec![Ok(head.to_vec()), Ok(tail.to_vec())]);
        let config = FrameConfig {
            stale_after: Duration::from_millis(20),
            ..FrameConfig::default()
        };
        let mut framed = FrameReader::with_config(reader, config);

        assert!(framed.read_frames().unwrap().is_empty());
        std::thread::sleep(Duration::from_millis(60));
        let frames = framed.read_frames().unwrap();

        assert!(frames.iter().all(|f| f.is_err()));
    }

    #[test]
    fn fresh_partial_packet_is_completed() {
        let bytes = wire(b"machine/go");
        let (head, tail) = bytes.split_at(5);
        let reader = ScriptedReader::new(vec![Ok(head.to_vec()), Ok(tail.to_vec())]);
        let mut framed = FrameReader::new(reader);

        assert!(framed.read_frames().unwrap().is_empty());
        let frames = framed.read_frames().unwrap();
        assert_eq!(frames[0].as_ref().unwrap().path(), "machine/go");
    }

    #[test]
    fn unterminated_overflow_is_dropped() {
        let config = FrameConfig {
            max_data_size: 8,
            ..FrameConfig::default()
        };
        let mut framed = FrameReader::with_config(Cursor::new(vec![b'x'; 32]), config);
        let frames = framed.read_frames().unwrap();

        assert!(matches!(frames[..], [Err(FrameError::PayloadTooLarge { .. })]));
        assert_eq!(framed.buffered(), 0);
    }

    #[test]
    fn threaded_reader_over_socket_pair() {
        let (mut left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        right
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let reader_thread = std::thread::spawn(move || {
            let mut reader = FrameReader::new(right);
            let mut seen = Vec::new();
            while seen.len() < 16 {
                for frame in reader.read_frames().unwrap() {
                    seen.push(frame.unwrap().data.to_vec());
                }
            }
            seen
        });

        for i in 0..16 {
            std::io::Write::write_all(&mut left, &wire(format!("msg:{i}").as_bytes())).unwrap();
        }

        let seen = reader_thread.join().unwrap();
        assert_eq!(seen[15], b"msg:15".to_vec());
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct ScriptedReader {
        steps: std::collections::VecDeque<std::result::Result<Vec<u8>, ErrorKind>>,
    }

    impl ScriptedReader {
        fn new(steps: Vec<std::result::Result<Vec<u8>, ErrorKind>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.steps.pop_front() {
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Some(Err(kind)) => Err(std::io::Error::from(kind)),
                None => Ok(0),
            }
        }
    }
}
