//! Commands served on the serial line.
//!
//! | Alias                  | Kind           | Reply                                 |
//! |------------------------|----------------|---------------------------------------|
//! | `machine/get:<key>`    | immediate      | `machine/get.reply:<key>:<value>`     |
//! | `machine/set:<k>:<v>`  | buffered       | `machine/set.reply:<k>:<v>`           |
//! | `machine/control_mode` | synced         | `machine/control_mode.reply:<mode>`   |
//!
//! Failures are answered on `<alias>.error` and reported to the dispatcher.

use std::sync::mpsc::Sender;
use std::sync::{Arc, PoisonError, RwLock};

use ertza_dispatch::{
    Command, Completion, DispatcherBuilder, Handler, HandlerError, HandlerKind,
};
use ertza_frame::{Frame, ERROR_SUFFIX};
use ertza_machine::{ControlMode, Machine, Value};
use tracing::debug;

pub const GET: &str = "machine/get";
pub const SET: &str = "machine/set";
pub const CONTROL_MODE: &str = "machine/control_mode";

const REPLY_SUFFIX: &str = ".reply";
const NO_CONTROL_MODE: &str = "none";

/// Writes run after any queued write with a lower priority.
const SET_PRIORITY: i32 = 10;

pub type SharedMachine = Arc<RwLock<Machine>>;

/// Register every machine command on `builder`.
pub fn register(
    builder: DispatcherBuilder,
    machine: SharedMachine,
    replies: Sender<Frame>,
) -> ertza_dispatch::Result<DispatcherBuilder> {
    let outlet = Replies(replies);
    builder
        .register(
            GET,
            Arc::new(GetHandler {
                machine: Arc::clone(&machine),
                replies: outlet.clone(),
            }),
        )?
        .register(
            SET,
            Arc::new(SetHandler {
                machine: Arc::clone(&machine),
                replies: outlet.clone(),
            }),
        )?
        .register(
            CONTROL_MODE,
            Arc::new(ControlModeHandler {
                machine,
                replies: outlet,
            }),
        )
}

#[derive(Clone)]
struct Replies(Sender<Frame>);

impl Replies {
    fn reply(&self, alias: &str, args: &[&str]) {
        self.send(Frame::from_parts(&format!("{alias}{REPLY_SUFFIX}"), args.iter().copied()));
    }

    /// Answer on `<alias>.error` and hand the error back to the dispatcher.
    fn fail(&self, alias: &str, err: HandlerError) -> HandlerError {
        let message = err.to_string();
        self.send(Frame::from_parts(
            &format!("{alias}{ERROR_SUFFIX}"),
            [message.as_str()],
        ));
        err
    }

    fn send(&self, frame: Frame) {
        if self.0.send(frame).is_err() {
            debug!("reply dropped, server gone");
        }
    }
}

fn required<'a>(command: &'a Command, index: usize, name: &str) -> Result<&'a str, HandlerError> {
    command
        .arg(index)
        .ok_or_else(|| HandlerError::InvalidArguments {
            alias: command.alias.clone(),
            message: format!("missing {name}"),
        })
}

struct GetHandler {
    machine: SharedMachine,
    replies: Replies,
}

impl Handler for GetHandler {
    fn execute(&self, command: &Command, _done: Completion) -> Result<(), HandlerError> {
        let key = required(command, 0, "key").map_err(|err| self.replies.fail(GET, err))?;
        let value = self
            .machine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .read(key)
            .map_err(|err| self.replies.fail(GET, HandlerError::Failed(err.to_string())))?;
        self.replies.reply(GET, &[key, &value.to_string()]);
        Ok(())
    }
}

struct SetHandler {
    machine: SharedMachine,
    replies: Replies,
}

impl Handler for SetHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Buffered {
            priority: SET_PRIORITY,
        }
    }

    fn execute(&self, command: &Command, _done: Completion) -> Result<(), HandlerError> {
        let (key, raw) = required(command, 0, "key")
            .and_then(|key| Ok((key, required(command, 1, "value")?)))
            .map_err(|err| self.replies.fail(SET, err))?;

        let forward_errors = self
            .machine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .write(key, Value::parse(raw))
            .map_err(|err| self.replies.fail(SET, HandlerError::Failed(err.to_string())))?;

        for (serial, err) in &forward_errors {
            let message = format!("slave {serial}: {err}");
            self.replies.send(Frame::from_parts(
                &format!("{SET}{ERROR_SUFFIX}"),
                [key, message.as_str()],
            ));
        }
        self.replies.reply(SET, &[key, raw]);
        Ok(())
    }
}

/// Switches the control mode and holds the caller until it is in place.
struct ControlModeHandler {
    machine: SharedMachine,
    replies: Replies,
}

impl Handler for ControlModeHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Synced
    }

    fn execute(&self, command: &Command, done: Completion) -> Result<(), HandlerError> {
        let name = required(command, 0, "mode").map_err(|err| self.replies.fail(CONTROL_MODE, err))?;
        let mode = match name {
            NO_CONTROL_MODE => None,
            other => Some(other.parse::<ControlMode>().map_err(|message| {
                self.replies.fail(
                    CONTROL_MODE,
                    HandlerError::InvalidArguments {
                        alias: command.alias.clone(),
                        message,
                    },
                )
            })?),
        };

        self.machine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_control_mode(mode);
        done.complete();
        self.replies.reply(CONTROL_MODE, &[name]);
        Ok(())
    }

    fn on_sync(&self, _command: &Command) -> Result<(), HandlerError> {
        let current = self
            .machine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .control_mode();
        let name = current.map_or(NO_CONTROL_MODE, |mode| mode.as_str());
        self.replies.reply(CONTROL_MODE, &[name]);
        Ok(())
    }
}
