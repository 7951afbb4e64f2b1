use std::collections::BTreeMap;

use crate::error::ParameterError;

/// Read-only entry listing attached slaves, present in master mode.
pub const SLAVES_KEY: &str = "slaves";

/// Access mode of a machine parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

const READ_WRITE: &[&str] = &[
    "command:enable",
    "command:cancel",
    "command:clear_errors",
    "command:reset",
    "command:control_mode",
    "command:move_mode",
    "command:go",
    "command:set_home",
    "command:go_home",
    "jog",
    "torque_ref",
    "torque_rise_time",
    "torque_fall_time",
    "velocity_ref",
    "position_ref",
    "acceleration",
    "deceleration",
];

const READ_ONLY: &[&str] = &[
    "machine:serialnumber",
    "status:drive_ready",
    "status:drive_enable",
    "status:velocity",
    "status:position",
    "status:torque",
];

/// Parameter name to access mode table of a machine mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineMap {
    entries: BTreeMap<String, Access>,
}

impl MachineMap {
    /// The table every mode starts from.
    pub fn standalone() -> Self {
        let entries = READ_WRITE
            .iter()
            .map(|k| (k.to_string(), Access::ReadWrite))
            .chain(READ_ONLY.iter().map(|k| (k.to_string(), Access::ReadOnly)))
            .collect();
        Self { entries }
    }

    /// The standalone table plus the read-only slave listing.
    pub fn master() -> Self {
        Self::standalone().with_entry(SLAVES_KEY, Access::ReadOnly)
    }

    pub fn with_entry(mut self, key: impl Into<String>, access: Access) -> Self {
        self.entries.insert(key.into(), access);
        self
    }

    pub fn access(&self, key: &str) -> Option<Access> {
        self.entries.get(key).copied()
    }

    pub fn check_read(&self, key: &str) -> Result<(), ParameterError> {
        self.access(key)
            .map(|_| ())
            .ok_or_else(|| ParameterError::Unknown(key.to_string()))
    }

    pub fn check_write(&self, key: &str) -> Result<(), ParameterError> {
        match self.access(key) {
            Some(Access::ReadWrite) => Ok(()),
            Some(Access::ReadOnly) => Err(ParameterError::ReadOnly(key.to_string())),
            None => Err(ParameterError::Unknown(key.to_string())),
        }
    }

    /// Every parameter name with its access mode, sorted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Access)> {
        self.entries.iter().map(|(k, a)| (k.as_str(), *a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MachineMap {
    fn default() -> Self {
        Self::standalone()
    }
}
