use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::config::{MachineConfig, SlaveSections};
use crate::control::{is_unconditional, ControlMode};
use crate::error::{ForwardError, ResolveError};
use crate::guard::ValueGuard;
use crate::parameter::ParameterMap;
use crate::resolver::{RuleSpec, SlaveConfigResolver};
use crate::roster::{SlaveRemote, SlaveRoster};
use crate::value::Value;

/// Mirrors master parameter writes onto slaves.
///
/// Owns its value guard; holds the slave roster as a read-only snapshot.
pub struct MasterForwardingEngine {
    map: Arc<dyn ParameterMap>,
    guard: ValueGuard,
    resolver: SlaveConfigResolver,
    roster: SlaveRoster,
    static_keys: HashSet<String>,
    last_values: Mutex<HashMap<String, Value>>,
}

impl MasterForwardingEngine {
    pub fn new(
        config: &MachineConfig,
        sections: SlaveSections,
        roster: SlaveRoster,
        map: Arc<dyn ParameterMap>,
    ) -> Self {
        Self {
            map,
            guard: ValueGuard::new(config.guard_interval),
            resolver: SlaveConfigResolver::new(sections, &roster),
            roster,
            static_keys: config.static_keys.iter().cloned().collect(),
            last_values: Mutex::new(HashMap::new()),
        }
    }

    /// Send `key` to one slave if the control mode calls for it.
    ///
    /// Returns whether anything was sent. With no control mode this is a
    /// no-op. Unconditional keys are mirrored verbatim regardless of the
    /// mode's key set; keys in the mode's set are transformed first.
    pub fn send_to_slave(
        &self,
        slave: &dyn SlaveRemote,
        mode: Option<ControlMode>,
        key: &str,
        value: Option<&Value>,
    ) -> Result<bool, ForwardError> {
        let Some(mode) = mode else {
            return Ok(false);
        };

        let mut sent = false;
        if mode.forwards(key) {
            if let Some(out) = self.value_for_slave(slave, key, value)? {
                self.deliver(slave, key, &out)?;
                sent = true;
            }
        }
        if is_unconditional(key) {
            let out = match value {
                Some(v) => v.clone(),
                None => self.live_value(slave, key)?,
            };
            self.deliver(slave, key, &out)?;
            sent = true;
        }
        Ok(sent)
    }

    /// Compute the value `slave` should receive for `key`.
    ///
    /// An unattached slave gets the caller's value unchanged (`None` if
    /// there is none). A slave without a config section forwards.
    pub fn value_for_slave(
        &self,
        slave: &dyn SlaveRemote,
        key: &str,
        value: Option<&Value>,
    ) -> Result<Option<Value>, ForwardError> {
        let serial = slave.serial();
        if !self.resolver.is_known(serial) {
            warn!(%serial, %key, "no config registered for slave");
            return Ok(value.cloned());
        }

        let spec = match self.resolver.resolve(serial, key) {
            Ok(spec) => spec,
            Err(ResolveError::ConfigSectionNotFound(_)) => {
                debug!(%serial, %key, "no config section, forwarding as-is");
                RuleSpec::forward()
            }
            Err(err) => return Err(err.into()),
        };
        let rule = spec.into_rule(serial, key)?;
        if let Some(fixed) = rule.fixed_value() {
            return Ok(Some(fixed));
        }

        let input = match value {
            Some(v) => v.clone(),
            None if self.static_keys.contains(key) => match self.last_value(key) {
                Some(v) => v,
                None => self.map.read(key).map_err(|_| no_value(serial, key))?,
            },
            None => self.live_value(slave, key)?,
        };

        let out = rule.apply(key, &input)?;
        if out != input {
            debug!(%key, from = %input, to = %out, mode = %rule.mode(), "modified value");
        }
        Ok(Some(out))
    }

    /// Forward `key` to every slave in the roster.
    ///
    /// Each slave is tried independently; failures are collected by serial.
    pub fn forward(
        &self,
        mode: Option<ControlMode>,
        key: &str,
        value: Option<&Value>,
    ) -> Vec<(String, ForwardError)> {
        self.roster
            .iter()
            .filter_map(|slave| {
                self.send_to_slave(slave.as_ref(), mode, key, value)
                    .err()
                    .map(|err| (slave.serial().to_string(), err))
            })
            .collect()
    }

    /// Remember the last value written for `key`.
    pub fn record_last_value(&self, key: &str, value: &Value) {
        self.last_values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.clone());
    }

    pub fn last_value(&self, key: &str) -> Option<Value> {
        self.last_values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Replace the roster snapshot and recompute known slaves.
    pub fn update_roster(&mut self, roster: SlaveRoster) {
        self.resolver.update_roster(&roster);
        self.roster = roster;
    }

    pub fn roster(&self) -> &SlaveRoster {
        &self.roster
    }

    pub fn resolver(&self) -> &SlaveConfigResolver {
        &self.resolver
    }

    pub fn guard(&self) -> &ValueGuard {
        &self.guard
    }

    fn live_value(&self, slave: &dyn SlaveRemote, key: &str) -> Result<Value, ForwardError> {
        self.guard
            .guarded_read(key, self.map.as_ref())
            .map_err(|_| no_value(slave.serial(), key))
    }

    fn deliver(&self, slave: &dyn SlaveRemote, key: &str, value: &Value) -> Result<(), ForwardError> {
        debug!(serial = %slave.serial(), %key, %value, "forwarding to slave");
        slave
            .set_to_remote(key, value)
            .map_err(|source| ForwardError::Send {
                serial: slave.serial().to_string(),
                key: key.to_string(),
                source,
            })
    }
}

fn no_value(serial: &str, key: &str) -> ForwardError {
    ForwardError::NoForwardValue {
        serial: serial.to_string(),
        key: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::slave_sections;
    use crate::parameter::MemoryParameterMap;
    use crate::roster::RemoteSendError;

    #[derive(Default)]
    struct Recording {
        serial: String,
        sent: Mutex<Vec<(String, Value)>>,
    }

    impl Recording {
        fn new(serial: &str) -> Arc<Self> {
            Arc::new(Self {
                serial: serial.to_string(),
                ..Self::default()
            })
        }

        fn sent(&self) -> Vec<(String, Value)> {
            self.sent.lock().expect("lock").clone()
        }
    }

    impl SlaveRemote for Recording {
        fn serial(&self) -> &str {
            &self.serial
        }

        fn set_to_remote(&self, key: &str, value: &Value) -> Result<(), RemoteSendError> {
            self.sent
                .lock()
                .expect("lock")
                .push((key.to_string(), value.clone()));
            Ok(())
        }
    }

    fn engine(
        doc: &str,
        slaves: &[Arc<Recording>],
        map: Arc<MemoryParameterMap>,
        config: MachineConfig,
    ) -> MasterForwardingEngine {
        let doc: toml::Table = toml::from_str(doc).expect("valid toml");
        let roster = SlaveRoster::new(
            slaves
                .iter()
                .map(|s| Arc::clone(s) as Arc<dyn SlaveRemote>)
                .collect(),
        );
        MasterForwardingEngine::new(&config, slave_sections(&doc), roster, map)
    }

    const SLAVE_5: &str = r#"
        [slave_5]
        velocity_ref_mode = "multiply"
        velocity_ref_value = 2.0
    "#;

    #[test]
    fn no_mode_is_a_no_op() {
        let slave = Recording::new("5");
        let e = engine(SLAVE_5, &[slave.clone()], Arc::default(), MachineConfig::default());
        let sent = e
            .send_to_slave(slave.as_ref(), None, "command:enable", Some(&Value::Bool(true)))
            .expect("send");
        assert!(!sent);
        assert!(slave.sent().is_empty());
    }

    #[test]
    fn key_outside_mode_set_is_not_sent() {
        let slave = Recording::new("5");
        let e = engine(SLAVE_5, &[slave.clone()], Arc::default(), MachineConfig::default());
        let sent = e
            .send_to_slave(
                slave.as_ref(),
                Some(ControlMode::Torque),
                "velocity_ref",
                Some(&Value::Float(1.0)),
            )
            .expect("send");
        assert!(!sent);
    }

    #[test]
    fn live_value_read_through_guard() {
        let map = Arc::new(MemoryParameterMap::with_values([(
            "velocity_ref",
            Value::Float(3.0),
        )]));
        let slave = Recording::new("5");
        let e = engine(SLAVE_5, &[slave.clone()], map.clone(), MachineConfig::default());

        e.send_to_slave(slave.as_ref(), Some(ControlMode::Velocity), "velocity_ref", None)
            .expect("send");
        assert_eq!(slave.sent(), vec![("velocity_ref".into(), Value::Float(6.0))]);
    }

    #[test]
    fn missing_live_value_names_slave_and_key() {
        let slave = Recording::new("5");
        let e = engine(SLAVE_5, &[slave.clone()], Arc::default(), MachineConfig::default());
        let err = e
            .value_for_slave(slave.as_ref(), "velocity_ref", None)
            .unwrap_err();
        assert_eq!(
            err,
            ForwardError::NoForwardValue {
                serial: "5".into(),
                key: "velocity_ref".into()
            }
        );
    }

    #[test]
    fn static_key_uses_last_value_then_live() {
        let map = Arc::new(MemoryParameterMap::with_values([(
            "acceleration",
            Value::Float(10.0),
        )]));
        let slave = Recording::new("5");
        let config = MachineConfig {
            static_keys: vec!["acceleration".into()],
            guard_interval: Duration::from_secs(60),
        };
        let e = engine("[slave_5]\n", &[slave.clone()], map, config);

        assert_eq!(
            e.value_for_slave(slave.as_ref(), "acceleration", None),
            Ok(Some(Value::Float(10.0)))
        );
        e.record_last_value("acceleration", &Value::Float(4.0));
        assert_eq!(
            e.value_for_slave(slave.as_ref(), "acceleration", None),
            Ok(Some(Value::Float(4.0)))
        );
    }

    #[test]
    fn unknown_slave_gets_input_unchanged() {
        let known = Recording::new("5");
        let stranger = Recording::new("9");
        let e = engine(SLAVE_5, &[known], Arc::default(), MachineConfig::default());

        assert_eq!(
            e.value_for_slave(stranger.as_ref(), "velocity_ref", Some(&Value::Float(3.0))),
            Ok(Some(Value::Float(3.0)))
        );
        assert_eq!(e.value_for_slave(stranger.as_ref(), "velocity_ref", None), Ok(None));
        assert!(!e
            .send_to_slave(stranger.as_ref(), Some(ControlMode::Velocity), "velocity_ref", None)
            .expect("send"));
    }

    #[test]
    fn slave_without_section_forwards() {
        let slave = Recording::new("7");
        let e = engine(SLAVE_5, &[slave.clone()], Arc::default(), MachineConfig::default());
        assert_eq!(
            e.value_for_slave(slave.as_ref(), "velocity_ref", Some(&Value::Float(3.0))),
            Ok(Some(Value::Float(3.0)))
        );
    }

    #[test]
    fn forward_collects_failures_per_slave() {
        let good = Recording::new("5");
        let bad = Recording::new("6");
        let doc = r#"
            [slave_5]
            velocity_ref_mode = "multiply"
            velocity_ref_value = 2.0

            [slave_6]
            velocity_ref_mode = "divide"
        "#;
        let e = engine(doc, &[good.clone(), bad.clone()], Arc::default(), MachineConfig::default());

        let errors = e.forward(Some(ControlMode::Velocity), "velocity_ref", Some(&Value::Float(1.5)));

        assert_eq!(good.sent(), vec![("velocity_ref".into(), Value::Float(3.0))]);
        assert!(bad.sent().is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "6");
        assert!(matches!(errors[0].1, ForwardError::MissingTransformValue { .. }));
    }

    #[test]
    fn update_roster_changes_targets() {
        let first = Recording::new("5");
        let second = Recording::new("6");
        let mut e = engine(SLAVE_5, &[first.clone()], Arc::default(), MachineConfig::default());

        e.update_roster(SlaveRoster::new(vec![second.clone() as Arc<dyn SlaveRemote>]));
        e.forward(Some(ControlMode::Position), "command:reset", Some(&Value::Bool(true)));

        assert!(first.sent().is_empty());
        assert_eq!(second.sent().len(), 1);
        assert!(e.resolver().is_known("6"));
        assert!(!e.resolver().is_known("5"));
    }
}
