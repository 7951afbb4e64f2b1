use std::time::Duration;

use ertza_frame::FrameConfig;
use ertza_transport::SerialSettings;

/// Serial server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub serial: SerialSettings,
    pub frame: FrameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default().with_control_lines(),
            frame: FrameConfig::default(),
        }
    }
}

/// Drive control link settings.
#[derive(Debug, Clone)]
pub struct ControlLinkConfig {
    pub serial: SerialSettings,
    /// Speed reported at the far end of the tick range.
    pub max_speed: f64,
    /// Mapped speeds below this are raised to it.
    pub min_speed: f64,
    pub dead_zone: i64,
    /// Initial width of the tick range above the first sample.
    pub init_range: i64,
    /// Consecutive failed reads tolerated before the link is declared unreliable.
    pub max_lost_data: u32,
    /// Polling period of the monitor loop.
    pub refresh: Duration,
    /// Bytes requested per telemetry read.
    pub read_size: usize,
}

impl Default for ControlLinkConfig {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default().with_timeout(Duration::from_millis(50)),
            max_speed: 0.0,
            min_speed: 0.0,
            dead_zone: 20,
            init_range: 800,
            max_lost_data: 10,
            refresh: Duration::from_millis(400),
            read_size: 40,
        }
    }
}
