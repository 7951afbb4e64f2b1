use std::collections::BTreeSet;

use tracing::debug;

use crate::config::{SlaveSections, SLAVE_SECTION_PREFIX};
use crate::error::{ForwardError, ResolveError};
use crate::roster::SlaveRoster;
use crate::rule::ForwardRule;

const DEFAULT_MODE: &str = "forward";

/// A configured `(mode, value)` pair before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub mode: String,
    pub value: Option<f64>,
}

impl RuleSpec {
    pub fn forward() -> Self {
        Self {
            mode: DEFAULT_MODE.to_string(),
            value: None,
        }
    }

    /// Validate into a [`ForwardRule`].
    pub fn into_rule(self, serial: &str, key: &str) -> Result<ForwardRule, ForwardError> {
        ForwardRule::new(serial, key, &self.mode, self.value)
    }
}

/// Resolves per-slave transform rules from `slave_<serial>` sections.
#[derive(Debug, Clone)]
pub struct SlaveConfigResolver {
    sections: SlaveSections,
    known: BTreeSet<String>,
}

impl SlaveConfigResolver {
    pub fn new(sections: SlaveSections, roster: &SlaveRoster) -> Self {
        let mut resolver = Self {
            sections,
            known: BTreeSet::new(),
        };
        resolver.update_roster(roster);
        resolver
    }

    /// Look up `<param>_mode` and `<param>_value` for a slave.
    ///
    /// `:` in `param` is read as `.`, so `command:enable` resolves
    /// `command.enable_mode`. A missing mode means `forward`, a missing
    /// value means none.
    pub fn resolve(&self, serial: &str, param: &str) -> Result<RuleSpec, ResolveError> {
        let section = self
            .sections
            .get(&format!("{SLAVE_SECTION_PREFIX}{serial}"))
            .ok_or_else(|| ResolveError::ConfigSectionNotFound(serial.to_string()))?;

        let option = param.replace(':', ".");
        let mode_key = format!("{option}_mode");
        let value_key = format!("{option}_value");

        let mode = match lookup(section, &mode_key) {
            Some(toml::Value::String(mode)) => mode.clone(),
            Some(other) => other.to_string(),
            None => DEFAULT_MODE.to_string(),
        };
        let value = match lookup(section, &value_key) {
            None => None,
            Some(raw) => Some(numeric(raw).ok_or_else(|| ResolveError::InvalidValue {
                serial: serial.to_string(),
                key: value_key.clone(),
                found: raw.to_string(),
            })?),
        };

        debug!(%serial, %param, %mode, ?value, "resolved forward rule");
        Ok(RuleSpec { mode, value })
    }

    /// Serial numbers of the currently attached slaves.
    pub fn known_slaves(&self) -> &BTreeSet<String> {
        &self.known
    }

    pub fn is_known(&self, serial: &str) -> bool {
        self.known.contains(serial)
    }

    /// Recompute the known slaves from a new roster snapshot.
    pub fn update_roster(&mut self, roster: &SlaveRoster) {
        self.known = roster.serials().into_iter().collect();
    }
}

// Dotted keys written bare in TOML become nested tables; quoted ones stay flat.
fn lookup<'a>(table: &'a toml::Table, dotted: &str) -> Option<&'a toml::Value> {
    if let Some(value) = table.get(dotted) {
        return Some(value);
    }
    let (head, rest) = dotted.split_once('.')?;
    lookup(table.get(head)?.as_table()?, rest)
}

fn numeric(raw: &toml::Value) -> Option<f64> {
    match raw {
        toml::Value::Float(f) => Some(*f),
        toml::Value::Integer(i) => Some(*i as f64),
        toml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
