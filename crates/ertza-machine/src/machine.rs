use std::sync::Arc;

use tracing::{debug, error, info};

use crate::access::{MachineMap, SLAVES_KEY};
use crate::control::ControlMode;
use crate::engine::MasterForwardingEngine;
use crate::error::{ForwardError, MachineError, Result};
use crate::parameter::ParameterMap;
use crate::roster::SlaveRoster;
use crate::value::Value;

/// Operating mode of a machine.
pub enum MachineMode {
    Standalone,
    Master(MasterForwardingEngine),
    Slave { master: Option<String> },
}

impl MachineMode {
    pub fn name(&self) -> &'static str {
        match self {
            MachineMode::Standalone => "standalone",
            MachineMode::Master(_) => "master",
            MachineMode::Slave { .. } => "slave",
        }
    }

    fn machine_map(&self) -> MachineMap {
        match self {
            MachineMode::Master(_) => MachineMap::master(),
            MachineMode::Standalone | MachineMode::Slave { .. } => MachineMap::standalone(),
        }
    }
}

/// A drive's parameter map seen through its current mode.
pub struct Machine {
    map: Arc<dyn ParameterMap>,
    access: MachineMap,
    mode: MachineMode,
    control_mode: Option<ControlMode>,
}

impl Machine {
    /// Create a standalone machine over `map`.
    pub fn new(map: Arc<dyn ParameterMap>) -> Self {
        Self {
            map,
            access: MachineMap::standalone(),
            mode: MachineMode::Standalone,
            control_mode: None,
        }
    }

    /// Replace the operating mode and its parameter table.
    pub fn switch_mode(&mut self, mode: MachineMode) {
        info!(from = self.mode.name(), to = mode.name(), "switching machine mode");
        self.access = mode.machine_map();
        self.mode = mode;
    }

    pub fn mode(&self) -> &MachineMode {
        &self.mode
    }

    pub fn access(&self) -> &MachineMap {
        &self.access
    }

    pub fn parameters(&self) -> &Arc<dyn ParameterMap> {
        &self.map
    }

    pub fn control_mode(&self) -> Option<ControlMode> {
        self.control_mode
    }

    /// Select the control mode that decides which keys are forwarded.
    pub fn set_control_mode(&mut self, mode: Option<ControlMode>) {
        debug!(mode = ?mode.map(|m| m.as_str()), "control mode set");
        self.control_mode = mode;
    }

    /// Read a parameter through the mode's access table.
    pub fn read(&self, key: &str) -> Result<Value> {
        self.access.check_read(key)?;
        if key == SLAVES_KEY {
            if let MachineMode::Master(engine) = &self.mode {
                return Ok(Value::Text(engine.roster().serials().join(",")));
            }
        }
        Ok(self.map.read(key)?)
    }

    /// Write a parameter locally, then mirror it onto slaves in master mode.
    ///
    /// Every forwarding failure is logged and returned; the local write has
    /// already happened when they are reported.
    pub fn write(&self, key: &str, value: Value) -> Result<Vec<(String, ForwardError)>> {
        self.access.check_write(key)?;
        self.map.write(key, value.clone())?;

        let MachineMode::Master(engine) = &self.mode else {
            return Ok(Vec::new());
        };
        engine.record_last_value(key, &value);
        let errors = engine.forward(self.control_mode, key, Some(&value));
        for (serial, err) in &errors {
            error!(%serial, %key, error = %err, "forwarding failed");
        }
        Ok(errors)
    }

    /// Replace the slave roster of a master machine.
    pub fn update_roster(&mut self, roster: SlaveRoster) -> Result<()> {
        match &mut self.mode {
            MachineMode::Master(engine) => {
                engine.update_roster(roster);
                Ok(())
            }
            _ => Err(MachineError::NotMaster),
        }
    }
}
