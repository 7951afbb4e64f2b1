//! Running ertza components over serial links.
//!
//! - [`SerialServer`] reads command frames on a background thread and
//!   delivers them to the command layer as [`ertza_dispatch::Command`]s.
//! - [`SerialControlLink`] drives a physical unit: outbound control
//!   commands, telemetry polling and tick-to-speed mapping.
//! - [`SerialSlave`] is the [`ertza_machine::SlaveRemote`] that carries
//!   forwarded values to a slave drive.

pub mod config;
pub mod control_link;
pub mod error;
pub mod monitor;
pub mod server;
pub mod slave;
pub mod speed;

pub use config::{ControlLinkConfig, ServerConfig};
pub use control_link::{ProductInfo, Sample, SerialControlLink};
pub use error::{RemoteError, Result};
pub use monitor::monitor;
pub use server::{SerialServer, SERIAL_SENDER};
pub use slave::SerialSlave;
pub use speed::{SpeedMapper, TickRange};
