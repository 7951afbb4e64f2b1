use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod check;
pub mod monitor;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve machine commands on the server serial line.
    Serve(ServeArgs),
    /// Poll drive telemetry and print mapped speed samples.
    Monitor(MonitorArgs),
    /// Validate the configuration and list per-slave forwarding rules.
    Check(CheckArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, config: Option<&Path>, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, config),
        Command::Monitor(args) => monitor::run(args, config, format),
        Command::Check(args) => check::run(args, config, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Serial device, overriding `[server] device`.
    #[arg(long)]
    pub device: Option<String>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial device, overriding `[control] device`.
    #[arg(long)]
    pub device: Option<String>,
    /// Exit after printing N samples.
    #[arg(long)]
    pub count: Option<usize>,
    /// Query and print the drive identification first.
    #[arg(long)]
    pub product_info: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Also list keys that fall back to plain forwarding.
    #[arg(long)]
    pub all: bool,
    /// Configuration file to check, overriding `--config`.
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// A flag that turns true on Ctrl-C.
fn stop_flag() -> CliResult<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let handle = Arc::clone(&stop);
    ctrlc::set_handler(move || handle.store(true, Ordering::SeqCst))
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(stop)
}
