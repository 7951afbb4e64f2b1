use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameConfig, DEFAULT_MAX_DATA, LENGTH_SIZE, TERMINATOR};
use crate::error::{FrameError, Result};

/// Scratch space for one encoded frame: the largest default frame fits.
const SCRATCH_CAPACITY: usize = DEFAULT_MAX_DATA + LENGTH_SIZE + TERMINATOR.len();

/// Sends server frames over any `Write` stream.
///
/// Every frame is written in full and flushed before `send` returns, so a
/// shared writer never interleaves two frames on the wire.
pub struct FrameWriter<T> {
    inner: T,
    scratch: BytesMut,
    max_data_size: usize,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Only `max_data_size` is taken from `config`.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            scratch: BytesMut::with_capacity(SCRATCH_CAPACITY),
            max_data_size: config.max_data_size,
        }
    }

    /// Send `frame` with a length field computed from its data.
    ///
    /// A stale `declared_len` is never put on the wire.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(&frame.data)
    }

    /// Encode and send one `path[:arg]*` data block.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.max_data_size {
            return Err(FrameError::PayloadTooLarge {
                size: data.len(),
                max: self.max_data_size,
            });
        }

        self.scratch.clear();
        encode_frame(data, &mut self.scratch)?;
        trace!(size = self.scratch.len(), "writing frame");

        let mut pending = &self.scratch[..];
        while !pending.is_empty() {
            match retrying(|| self.inner.write(pending))? {
                0 => return Err(FrameError::ConnectionClosed),
                n => pending = &pending[n..],
            }
        }
        retrying(|| self.inner.flush())
    }

    /// Largest data block `send` accepts.
    pub fn max_data_size(&self) -> usize {
        self.max_data_size
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

// Interrupted and would-block calls are repeated; anything else is final.
fn retrying<R>(mut op: impl FnMut() -> std::io::Result<R>) -> Result<R> {
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {}
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}
