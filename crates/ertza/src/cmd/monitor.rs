use std::path::Path;
use std::sync::atomic::Ordering;

use ertza_remote::{monitor, SerialControlLink};
use tracing::info;

use crate::cmd::{stop_flag, MonitorArgs};
use crate::config::AppConfig;
use crate::exit::{remote_error, CliResult, SUCCESS};
use crate::output::{print_product_info, print_sample, OutputFormat};

pub fn run(args: MonitorArgs, config: Option<&Path>, format: OutputFormat) -> CliResult<i32> {
    let config = AppConfig::load_or_default(config)?;
    let mut link_config = config.control_config()?;
    if let Some(device) = args.device {
        link_config.serial.device = Some(device);
    }
    let refresh = link_config.refresh;

    let mut link =
        SerialControlLink::open(link_config).map_err(|err| remote_error("open control link", err))?;

    if args.product_info {
        let info = link
            .product_info()
            .map_err(|err| remote_error("product info", err))?;
        print_product_info(&info, format);
    }

    let stop = stop_flag()?;
    let mut printed = 0usize;

    monitor(&mut link, refresh, &stop, |sample| {
        print_sample(&sample, format);
        printed += 1;
        if args.count.is_some_and(|count| printed >= count) {
            stop.store(true, Ordering::SeqCst);
        }
    })
    .map_err(|err| remote_error("telemetry", err))?;

    info!(samples = printed, "monitor stopped");
    Ok(SUCCESS)
}
