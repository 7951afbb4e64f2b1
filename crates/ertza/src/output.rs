use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ertza_remote::{ProductInfo, Sample};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct SampleOutput {
    ticks: i32,
    turns: f32,
    mapped_speed: f64,
    timestamp: String,
}

pub fn print_sample(sample: &Sample, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SampleOutput {
                ticks: sample.ticks,
                turns: sample.turns,
                mapped_speed: sample.mapped_speed,
                timestamp: now_unix_seconds(),
            };
            println!("{}", to_json(&out));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TICKS", "TURNS", "SPEED"])
                .add_row(vec![
                    sample.ticks.to_string(),
                    format!("{:.3}", sample.turns),
                    format!("{:.3}", sample.mapped_speed),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "ticks={} turns={:.3} speed={:.3}",
                sample.ticks, sample.turns, sample.mapped_speed
            );
        }
        OutputFormat::Raw => {
            println!("{}\t{}\t{}", sample.ticks, sample.turns, sample.mapped_speed);
        }
    }
}

#[derive(Serialize)]
struct ProductOutput {
    product_id: u8,
    device_id: u8,
}

pub fn print_product_info(info: &ProductInfo, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ProductOutput {
                product_id: info.product_id,
                device_id: info.device_id,
            };
            println!("{}", to_json(&out));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["PRODUCT", "DEVICE"])
                .add_row(vec![info.product_id.to_string(), info.device_id.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("product={} device={}", info.product_id, info.device_id);
        }
    }
}

/// One resolved forwarding rule of a slave section.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuleRow {
    pub slave: String,
    pub key: String,
    pub mode: String,
    pub value: Option<f64>,
    /// `None` when the rule is valid.
    pub error: Option<String>,
}

pub fn print_rules(rows: &[RuleRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(&rows)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SLAVE", "KEY", "MODE", "VALUE", "STATUS"]);
            for row in rows {
                table.add_row(vec![
                    row.slave.clone(),
                    row.key.clone(),
                    row.mode.clone(),
                    row.value.map(|v| v.to_string()).unwrap_or_default(),
                    row.error.clone().unwrap_or_else(|| "ok".to_string()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in rows {
                let value = row.value.map(|v| format!(" value={v}")).unwrap_or_default();
                match &row.error {
                    None => println!("slave_{} {} mode={}{value}", row.slave, row.key, row.mode),
                    Some(err) => println!("slave_{} {} error: {err}", row.slave, row.key),
                }
            }
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
