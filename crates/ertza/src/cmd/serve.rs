use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use ertza_dispatch::Dispatcher;
use ertza_machine::{
    Machine, MachineMode, MasterForwardingEngine, MemoryParameterMap, SlaveRemote, SlaveRoster,
};
use ertza_remote::{SerialServer, SerialSlave};
use ertza_transport::{SerialSettings, SerialStream};
use tracing::{debug, info, warn};

use crate::cmd::{stop_flag, ServeArgs};
use crate::config::{AppConfig, RunMode};
use crate::exit::{remote_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::handlers;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn run(args: ServeArgs, config: Option<&Path>) -> CliResult<i32> {
    let config = AppConfig::load_or_default(config)?;
    let mut server_config = config.server_config()?;
    if let Some(device) = args.device {
        server_config.serial.device = Some(device);
    }

    let machine = Arc::new(RwLock::new(build_machine(&config)?));
    let (reply_tx, reply_rx) = mpsc::channel();
    let mut dispatcher = handlers::register(Dispatcher::builder(), machine, reply_tx)
        .map_err(|err| CliError::new(INTERNAL, format!("command registration failed: {err}")))?
        .with_config(config.dispatch_config()?)
        .build();

    let (command_tx, command_rx) = mpsc::channel();
    let mut server = SerialServer::open(&server_config, command_tx)
        .map_err(|err| remote_error("open server", err))?;

    let stop = stop_flag()?;
    info!(
        mode = config.machine.mode.as_str(),
        commands = ?dispatcher.available_commands(),
        "serving"
    );

    while !stop.load(Ordering::SeqCst) && server.is_running() {
        match command_rx.recv_timeout(POLL_INTERVAL) {
            Ok(command) => {
                if let Err(err) = dispatcher.execute(command) {
                    debug!(error = %err, "command not dispatched");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        for reply in reply_rx.try_iter() {
            if let Err(err) = server.send_frame(&reply) {
                warn!(error = %err, "reply not sent");
            }
        }
    }

    dispatcher.shutdown();
    server.close();
    info!("server stopped");
    Ok(SUCCESS)
}

/// Build the machine described by `[machine]`, opening slave links in master mode.
fn build_machine(config: &AppConfig) -> CliResult<Machine> {
    let parameters = Arc::new(MemoryParameterMap::new());
    let mut machine = Machine::new(parameters.clone());

    match config.machine.mode {
        RunMode::Standalone => {}
        RunMode::Slave => machine.switch_mode(MachineMode::Slave {
            master: config.machine.master.clone(),
        }),
        RunMode::Master => {
            let mut slaves: Vec<Arc<dyn SlaveRemote>> = Vec::new();
            for link in &config.machine.slaves {
                let settings = SerialSettings::new(&link.device).with_baud_rate(link.baudrate);
                let stream = SerialStream::open(&settings)
                    .map_err(|err| transport_error(&format!("open slave {}", link.serial), err))?;
                info!(serial = %link.serial, device = %link.device, "slave attached");
                slaves.push(Arc::new(SerialSlave::new(link.serial.clone(), stream)));
            }
            let engine = MasterForwardingEngine::new(
                &config.machine_config()?,
                config.slave_sections(),
                SlaveRoster::new(slaves),
                parameters,
            );
            machine.switch_mode(MachineMode::Master(engine));
        }
    }

    machine.set_control_mode(config.control_mode()?);
    Ok(machine)
}
