//! The `ertza` configuration file.
//!
//! Every section is optional and falls back to the library defaults. Tables
//! named `slave_<serial>` hold per-slave forwarding rules and are handed to
//! the machine layer untouched.

use std::path::Path;
use std::time::Duration;

use ertza_dispatch::DispatchConfig;
use ertza_frame::FrameConfig;
use ertza_machine::{slave_sections, ControlMode, MachineConfig, SlaveSections};
use ertza_remote::{ControlLinkConfig, ServerConfig};
use ertza_transport::DEFAULT_BAUD_RATE;
use serde::Deserialize;

use crate::exit::{io_error, CliError, CliResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub machine: MachineSection,
    pub server: ServerSection,
    pub control: ControlSection,
    pub dispatch: DispatchSection,
    /// Every other top-level entry, slave sections included.
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Standalone,
    Master,
    Slave,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Standalone => "standalone",
            RunMode::Master => "master",
            RunMode::Slave => "slave",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MachineSection {
    pub mode: RunMode,
    pub control_mode: Option<String>,
    /// Seconds between live re-reads of a forwarded parameter.
    pub guard_interval: f64,
    pub static_keys: Vec<String>,
    /// Serial of the master driving this machine in slave mode.
    pub master: Option<String>,
    /// Serial lines to slave drives, used in master mode.
    pub slaves: Vec<SlaveLink>,
}

impl Default for MachineSection {
    fn default() -> Self {
        Self {
            mode: RunMode::Standalone,
            control_mode: None,
            guard_interval: MachineConfig::default().guard_interval.as_secs_f64(),
            static_keys: Vec::new(),
            master: None,
            slaves: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlaveLink {
    pub serial: String,
    pub device: String,
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub device: Option<String>,
    pub baudrate: u32,
    pub stale_timeout: f64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            device: None,
            baudrate: DEFAULT_BAUD_RATE,
            stale_timeout: FrameConfig::default().stale_after.as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlSection {
    pub device: Option<String>,
    pub baudrate: u32,
    pub max_speed: f64,
    pub min_speed: f64,
    pub dead_zone: i64,
    pub init_range: i64,
    pub max_lost_data: u32,
    pub refresh: f64,
}

impl Default for ControlSection {
    fn default() -> Self {
        let defaults = ControlLinkConfig::default();
        Self {
            device: None,
            baudrate: DEFAULT_BAUD_RATE,
            max_speed: defaults.max_speed,
            min_speed: defaults.min_speed,
            dead_zone: defaults.dead_zone,
            init_range: defaults.init_range,
            max_lost_data: defaults.max_lost_data,
            refresh: defaults.refresh.as_secs_f64(),
        }
    }
}

/// A missing `[dispatch]` section keeps the 5 s default; a section without
/// `sync_timeout` waits forever.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSection {
    /// Seconds a synced command may take.
    #[serde(default)]
    pub sync_timeout: Option<f64>,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            sync_timeout: DispatchConfig::default()
                .sync_timeout
                .map(|timeout| timeout.as_secs_f64()),
        }
    }
}

fn default_baudrate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl AppConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read config {}", path.display()), err))?;
        Self::parse(&text)
            .map_err(|err| CliError::new(err.code, format!("{}: {}", path.display(), err.message)))
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(text: &str) -> CliResult<Self> {
        let config: AppConfig =
            toml::from_str(text).map_err(|err| CliError::config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field that is only interpreted after deserialization.
    pub fn validate(&self) -> CliResult<()> {
        self.machine_config()?;
        self.control_mode()?;
        self.server_config()?;
        self.control_config()?;
        self.dispatch_config()?;
        if self.machine.mode == RunMode::Master && self.machine.slaves.is_empty() {
            tracing::warn!("master mode without slave links");
        }
        Ok(())
    }

    pub fn machine_config(&self) -> CliResult<MachineConfig> {
        Ok(MachineConfig {
            guard_interval: seconds("machine.guard_interval", self.machine.guard_interval)?,
            static_keys: self.machine.static_keys.clone(),
        })
    }

    pub fn control_mode(&self) -> CliResult<Option<ControlMode>> {
        self.machine
            .control_mode
            .as_deref()
            .map(|name| {
                name.parse::<ControlMode>()
                    .map_err(|err| CliError::config(format!("machine.control_mode: {err}")))
            })
            .transpose()
    }

    pub fn server_config(&self) -> CliResult<ServerConfig> {
        let mut config = ServerConfig::default();
        config.serial.device = self.server.device.clone();
        config.serial.baud_rate = self.server.baudrate;
        config.frame.stale_after = seconds("server.stale_timeout", self.server.stale_timeout)?;
        Ok(config)
    }

    pub fn control_config(&self) -> CliResult<ControlLinkConfig> {
        let section = &self.control;
        let mut config = ControlLinkConfig {
            max_speed: section.max_speed,
            min_speed: section.min_speed,
            dead_zone: section.dead_zone,
            init_range: section.init_range,
            max_lost_data: section.max_lost_data,
            refresh: seconds("control.refresh", section.refresh)?,
            ..ControlLinkConfig::default()
        };
        config.serial.device = section.device.clone();
        config.serial.baud_rate = section.baudrate;
        Ok(config)
    }

    pub fn dispatch_config(&self) -> CliResult<DispatchConfig> {
        let sync_timeout = self
            .dispatch
            .sync_timeout
            .map(|secs| seconds("dispatch.sync_timeout", secs))
            .transpose()?;
        Ok(DispatchConfig { sync_timeout })
    }

    /// The `slave_<serial>` tables of the file.
    pub fn slave_sections(&self) -> SlaveSections {
        slave_sections(&self.extra)
    }
}

fn seconds(field: &str, value: f64) -> CliResult<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        CliError::config(format!(
            "{field} must be a non-negative number of seconds, got {value}"
        ))
    })
}
