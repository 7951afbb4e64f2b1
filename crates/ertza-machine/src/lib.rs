//! Machine modes and master/slave value forwarding.
//!
//! A [`Machine`] wraps the drive's parameter map. In master mode every
//! write is mirrored onto the attached slaves through the
//! [`MasterForwardingEngine`], which picks the keys to forward from the
//! current [`ControlMode`], transforms values with per-slave
//! [`ForwardRule`]s and rate-limits live re-reads with a [`ValueGuard`].

pub mod access;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod guard;
pub mod machine;
pub mod parameter;
pub mod resolver;
pub mod roster;
pub mod rule;
pub mod value;

pub use access::{Access, MachineMap, SLAVES_KEY};
pub use config::{
    slave_sections, MachineConfig, SlaveSections, DEFAULT_GUARD_INTERVAL, SLAVE_SECTION_PREFIX,
};
pub use control::{is_unconditional, ControlMode, UNCONDITIONAL_FORWARD_KEYS};
pub use engine::MasterForwardingEngine;
pub use error::{ForwardError, MachineError, ParameterError, ResolveError, Result};
pub use guard::ValueGuard;
pub use machine::{Machine, MachineMode};
pub use parameter::{MemoryParameterMap, ParameterMap};
pub use resolver::{RuleSpec, SlaveConfigResolver};
pub use roster::{RemoteSendError, SlaveRemote, SlaveRoster};
pub use rule::{ForwardMode, ForwardRule};
pub use value::Value;
