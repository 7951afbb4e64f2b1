use std::collections::BTreeSet;
use std::path::Path;

use ertza_machine::{
    ControlMode, RuleSpec, SlaveConfigResolver, SlaveRoster, SLAVE_SECTION_PREFIX,
    UNCONDITIONAL_FORWARD_KEYS,
};
use tracing::info;

use crate::cmd::CheckArgs;
use crate::config::AppConfig;
use crate::exit::{CliError, CliResult, SUCCESS};
use crate::output::{print_rules, OutputFormat, RuleRow};

pub fn run(args: CheckArgs, config: Option<&Path>, format: OutputFormat) -> CliResult<i32> {
    let path = args.path.as_deref().or(config);
    let config = AppConfig::load_or_default(path)?;

    let rows = rule_rows(&config, args.all);
    print_rules(&rows, format);

    let invalid = rows.iter().filter(|row| row.error.is_some()).count();
    if invalid > 0 {
        return Err(CliError::config(format!(
            "{invalid} invalid forwarding rule(s)"
        )));
    }
    info!(
        mode = config.machine.mode.as_str(),
        slaves = config.slave_sections().len(),
        "configuration is valid"
    );
    Ok(SUCCESS)
}

/// Resolve every forwardable key for every slave section.
///
/// Keys left at plain forwarding are skipped unless `all` is set; invalid
/// rules are always listed.
pub fn rule_rows(config: &AppConfig, all: bool) -> Vec<RuleRow> {
    let sections = config.slave_sections();
    let serials: Vec<String> = sections
        .keys()
        .filter_map(|name| name.strip_prefix(SLAVE_SECTION_PREFIX))
        .map(str::to_string)
        .collect();
    let resolver = SlaveConfigResolver::new(sections, &SlaveRoster::default());

    let mut rows = Vec::new();
    for serial in &serials {
        for key in forwardable_keys() {
            let row = match resolver.resolve(serial, key) {
                Ok(spec) => {
                    let error = spec
                        .clone()
                        .into_rule(serial, key)
                        .err()
                        .map(|err| err.to_string());
                    if !all && error.is_none() && spec == RuleSpec::forward() {
                        continue;
                    }
                    RuleRow {
                        slave: serial.clone(),
                        key: key.to_string(),
                        mode: spec.mode,
                        value: spec.value,
                        error,
                    }
                }
                Err(err) => RuleRow {
                    slave: serial.clone(),
                    key: key.to_string(),
                    mode: String::new(),
                    value: None,
                    error: Some(err.to_string()),
                },
            };
            rows.push(row);
        }
    }
    rows
}

fn forwardable_keys() -> BTreeSet<&'static str> {
    ControlMode::ALL
        .iter()
        .flat_map(|mode| mode.forward_keys().iter().copied())
        .chain(UNCONDITIONAL_FORWARD_KEYS.iter().copied())
        .collect()
}
