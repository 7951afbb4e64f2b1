use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ertza_dispatch::Command;
use ertza_frame::{error_reply, Frame, FrameConfig, FrameError, FrameReader, FrameWriter};
use ertza_transport::SerialStream;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{RemoteError, Result};

/// Sender recorded on commands delivered by the serial server.
pub const SERIAL_SENDER: &str = "serial";

/// Announced on the wire when the server starts.
const ALIVE: &[u8] = b"alive";

const ERROR_BACKOFF: Duration = Duration::from_millis(100);

type SharedWriter = Arc<Mutex<FrameWriter<Box<dyn Write + Send>>>>;

/// Server side of the command protocol.
///
/// A background thread reads frames and delivers every well-formed one to
/// the command layer. Frames whose declared length is wrong are answered
/// with a `.error` reply and dropped.
pub struct SerialServer {
    running: Arc<AtomicBool>,
    writer: SharedWriter,
    reader: Option<JoinHandle<()>>,
}

impl SerialServer {
    /// Open the configured device and start serving it.
    pub fn open(config: &ServerConfig, outlet: Sender<Command>) -> Result<Self> {
        info!(
            device = config.serial.device.as_deref().unwrap_or("none"),
            baud_rate = config.serial.baud_rate,
            "starting serial server"
        );
        let stream = SerialStream::open(&config.serial)?;
        let writer = stream.try_clone()?;
        let reader = FrameReader::with_config_serial(stream, config.frame.clone())?;
        Self::spawn(reader, Box::new(writer), config.frame.clone(), outlet)
    }

    /// Serve an already-open stream pair.
    ///
    /// `reader` should have a read timeout so that [`SerialServer::close`]
    /// returns promptly.
    pub fn start<R, W>(
        reader: R,
        writer: W,
        config: FrameConfig,
        outlet: Sender<Command>,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let reader = FrameReader::with_config(reader, config.clone());
        Self::spawn(reader, Box::new(writer), config, outlet)
    }

    fn spawn<R>(
        reader: FrameReader<R>,
        writer: Box<dyn Write + Send>,
        config: FrameConfig,
        outlet: Sender<Command>,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let writer: SharedWriter = Arc::new(Mutex::new(FrameWriter::with_config(writer, config)));

        let handle = {
            let running = Arc::clone(&running);
            let writer = Arc::clone(&writer);
            thread::Builder::new()
                .name("ertza-serial-server".to_string())
                .spawn(move || read_loop(reader, &writer, &running, &outlet))?
        };

        let server = Self {
            running,
            writer,
            reader: Some(handle),
        };
        server.send_message(ALIVE)?;
        Ok(server)
    }

    /// Send a `path[:arg]*` data block as one frame.
    pub fn send_message(&self, data: &[u8]) -> Result<()> {
        if !self.is_running() {
            error!("serial server is not running, message dropped");
            return Err(RemoteError::NotRunning);
        }
        debug!(data = %String::from_utf8_lossy(data), "sending");
        send(&self.writer, data)
    }

    /// Send a frame built from a path and arguments.
    pub fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.send_message(frame.data.as_ref())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the reader thread and wait for it to exit.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.reader.take() {
            debug!("closing serial server");
            if handle.join().is_err() {
                error!("serial server reader panicked");
            }
        }
    }
}

impl Drop for SerialServer {
    fn drop(&mut self) {
        self.close();
    }
}

fn send(writer: &SharedWriter, data: &[u8]) -> Result<()> {
    writer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .send(data)
        .map_err(Into::into)
}

fn read_loop<R: Read>(
    mut reader: FrameReader<R>,
    writer: &SharedWriter,
    running: &AtomicBool,
    outlet: &Sender<Command>,
) {
    while running.load(Ordering::Acquire) {
        let batch = match reader.read_frames() {
            Ok(batch) => batch,
            Err(FrameError::ConnectionClosed) => {
                info!("serial stream closed");
                break;
            }
            Err(err) => {
                error!(error = %err, "serial read failed");
                thread::sleep(ERROR_BACKOFF);
                continue;
            }
        };

        for item in batch {
            match item {
                Ok(frame) => deliver(frame, outlet),
                Err(FrameError::LengthMismatch {
                    path,
                    declared,
                    actual,
                }) => {
                    error!(%path, declared, actual, "invalid length specified");
                    let reply = error_reply(&path, declared, actual);
                    if let Err(err) = send(writer, reply.data.as_ref()) {
                        error!(error = %err, "failed to send error reply");
                    }
                }
                Err(err) => error!(error = %err, "dropping faulty packet"),
            }
        }
    }
    running.store(false, Ordering::Release);
}

fn deliver(frame: Frame, outlet: &Sender<Command>) {
    let command = Command::new(frame.path())
        .with_args(frame.args().map(|arg| arg.into_owned()))
        .with_sender(SERIAL_SENDER);
    debug!(%command, "received");
    if outlet.send(command).is_err() {
        warn!("command outlet closed, frame dropped");
    }
}
