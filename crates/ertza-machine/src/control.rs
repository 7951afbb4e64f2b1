use std::fmt;
use std::str::FromStr;

/// Keys mirrored to every slave whatever the control mode.
pub const UNCONDITIONAL_FORWARD_KEYS: &[&str] = &[
    "command:enable",
    "command:cancel",
    "command:clear_errors",
    "command:reset",
];

const TORQUE_KEYS: &[&str] = &["torque_ref", "torque_rise_time", "torque_fall_time"];

const ENHANCED_TORQUE_KEYS: &[&str] = &[
    "torque_ref",
    "torque_rise_time",
    "torque_fall_time",
    "velocity_ref",
];

const VELOCITY_KEYS: &[&str] = &["velocity_ref", "acceleration", "deceleration"];

const POSITION_KEYS: &[&str] = &[
    "command:move_mode",
    "command:go",
    "command:set_home",
    "command:go_home",
    "velocity_ref",
    "position_ref",
    "acceleration",
    "deceleration",
];

/// Drive control mode. Each mode forwards its own set of keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMode {
    Torque,
    EnhancedTorque,
    Velocity,
    Position,
}

impl ControlMode {
    pub const ALL: [ControlMode; 4] = [
        ControlMode::Torque,
        ControlMode::EnhancedTorque,
        ControlMode::Velocity,
        ControlMode::Position,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMode::Torque => "torque",
            ControlMode::EnhancedTorque => "enhanced_torque",
            ControlMode::Velocity => "velocity",
            ControlMode::Position => "position",
        }
    }

    /// Keys forwarded (and transformed) in this mode.
    pub fn forward_keys(&self) -> &'static [&'static str] {
        match self {
            ControlMode::Torque => TORQUE_KEYS,
            ControlMode::EnhancedTorque => ENHANCED_TORQUE_KEYS,
            ControlMode::Velocity => VELOCITY_KEYS,
            ControlMode::Position => POSITION_KEYS,
        }
    }

    pub fn forwards(&self, key: &str) -> bool {
        self.forward_keys().contains(&key)
    }

    /// Value written to `command:control_mode` on the drive.
    pub fn drive_code(&self) -> i64 {
        match self {
            ControlMode::Torque => 1,
            ControlMode::Velocity => 2,
            ControlMode::Position => 3,
            ControlMode::EnhancedTorque => 4,
        }
    }
}

/// True for keys mirrored regardless of control mode.
pub fn is_unconditional(key: &str) -> bool {
    UNCONDITIONAL_FORWARD_KEYS.contains(&key)
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControlMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unrecognized control mode: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_excludes_enable() {
        assert!(!ControlMode::Position.forwards("command:enable"));
        assert!(ControlMode::Position.forwards("command:go_home"));
        assert!(is_unconditional("command:enable"));
    }

    #[test]
    fn enhanced_torque_adds_velocity() {
        assert!(ControlMode::EnhancedTorque.forwards("velocity_ref"));
        assert!(!ControlMode::Torque.forwards("velocity_ref"));
    }

    #[test]
    fn parse_round_names() {
        for mode in ControlMode::ALL {
            assert_eq!(mode.as_str().parse::<ControlMode>(), Ok(mode));
        }
        assert!("scale".parse::<ControlMode>().is_err());
    }
}
