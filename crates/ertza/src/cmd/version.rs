use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ertza {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ertza");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("ERTZA_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("default_baudrate: {}", ertza_transport::DEFAULT_BAUD_RATE);
    println!("max_frame_data: {}", ertza_frame::DEFAULT_MAX_DATA);
    println!("telemetry_line: {}", ertza_frame::LINE_LENGTH);

    Ok(SUCCESS)
}
