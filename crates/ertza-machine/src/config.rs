use std::collections::BTreeMap;
use std::time::Duration;

/// Minimum spacing between live re-reads of a forwarded parameter.
pub const DEFAULT_GUARD_INTERVAL: Duration = Duration::from_millis(30);

/// Prefix of per-slave configuration sections.
pub const SLAVE_SECTION_PREFIX: &str = "slave_";

/// Per-slave configuration sections, keyed by section name (`slave_<serial>`).
pub type SlaveSections = BTreeMap<String, toml::Table>;

/// Machine-level settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineConfig {
    pub guard_interval: Duration,
    /// Keys forwarded from their last written value instead of a live read.
    pub static_keys: Vec<String>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            guard_interval: DEFAULT_GUARD_INTERVAL,
            static_keys: Vec::new(),
        }
    }
}

/// Collect every `slave_<serial>` table from a parsed configuration document.
pub fn slave_sections(document: &toml::Table) -> SlaveSections {
    document
        .iter()
        .filter(|(name, _)| name.starts_with(SLAVE_SECTION_PREFIX))
        .filter_map(|(name, value)| value.as_table().map(|t| (name.clone(), t.clone())))
        .collect()
}
