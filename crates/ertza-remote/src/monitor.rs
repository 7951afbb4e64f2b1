use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use ertza_transport::LinkStream;
use tracing::{debug, error};

use crate::control_link::{Sample, SerialControlLink};
use crate::error::Result;

const STOP_POLL: Duration = Duration::from_millis(10);

/// Poll `link` every `refresh` and hand each sample to `on_sample`.
///
/// Runs until `stop` is set, or returns the error that ended it (typically
/// [`crate::RemoteError::LinkUnreliable`]).
pub fn monitor<T, F>(
    link: &mut SerialControlLink<T>,
    refresh: Duration,
    stop: &AtomicBool,
    mut on_sample: F,
) -> Result<()>
where
    T: LinkStream,
    F: FnMut(Sample),
{
    debug!(?refresh, "telemetry monitor started");
    while !stop.load(Ordering::Acquire) {
        let started = Instant::now();
        match link.safe_get() {
            Ok(sample) => on_sample(sample),
            Err(err) => {
                error!(error = %err, "telemetry monitor stopped");
                return Err(err);
            }
        }

        while !stop.load(Ordering::Acquire) {
            let elapsed = started.elapsed();
            if elapsed >= refresh {
                break;
            }
            thread::sleep(STOP_POLL.min(refresh - elapsed));
        }
    }
    debug!("telemetry monitor stopped on request");
    Ok(())
}
