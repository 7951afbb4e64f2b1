use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::ParameterError;
use crate::parameter::ParameterMap;
use crate::value::Value;

/// Rate-limits live re-reads of forwarded parameters.
///
/// Entries are keyed by parameter name only: forwarding the same key to
/// several slaves shares one cached sample.
#[derive(Debug)]
pub struct ValueGuard {
    interval: Duration,
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl ValueGuard {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Return the cached value while it is fresh, else read it live.
    pub fn guarded_read(&self, key: &str, map: &dyn ParameterMap) -> Result<Value, ParameterError> {
        self.guarded_read_at(key, map, Instant::now())
    }

    /// [`ValueGuard::guarded_read`] against an explicit clock.
    ///
    /// An entry is fresh while `now - stamp <= interval`. The cache is not
    /// locked during the live read, so a slow read only delays its own key.
    /// A sample never replaces one taken later.
    pub fn guarded_read_at(
        &self,
        key: &str,
        map: &dyn ParameterMap,
        now: Instant,
    ) -> Result<Value, ParameterError> {
        if let Some((value, stamp)) = self.lock().get(key) {
            if now.saturating_duration_since(*stamp) <= self.interval {
                trace!(%key, "guard hit");
                return Ok(value.clone());
            }
        }

        let value = map.read(key)?;
        let mut entries = self.lock();
        match entries.get(key) {
            Some((_, stamp)) if *stamp > now => {}
            _ => {
                entries.insert(key.to_string(), (value.clone(), now));
            }
        }
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (Value, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
