use std::time::Duration;

/// Dispatcher behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// How long a synced command may block the caller before it is given up
    /// on. `None` waits for the handler indefinitely.
    pub sync_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sync_timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl DispatchConfig {
    /// Wait for synced handlers without any bound.
    pub fn unbounded() -> Self {
        Self { sync_timeout: None }
    }
}
