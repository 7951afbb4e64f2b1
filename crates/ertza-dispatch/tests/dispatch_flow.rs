use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use ertza_dispatch::{
    Command, Completion, Dispatch, DispatchConfig, Dispatcher, Handler, HandlerError, HandlerKind,
};

struct Recorder {
    kind: HandlerKind,
    out: Mutex<Sender<String>>,
}

impl Recorder {
    fn new(kind: HandlerKind, out: Sender<String>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            out: Mutex::new(out),
        })
    }
}

impl Handler for Recorder {
    fn kind(&self) -> HandlerKind {
        self.kind
    }

    fn execute(&self, command: &Command, _done: Completion) -> Result<(), HandlerError> {
        self.out
            .lock()
            .expect("sender lock")
            .send(command.to_string())
            .map_err(|err| HandlerError::Failed(err.to_string()))
    }
}

/// Completes from a worker thread after a short delay.
struct Deferred;

impl Handler for Deferred {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Synced
    }

    fn execute(&self, _command: &Command, done: Completion) -> Result<(), HandlerError> {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            done.complete();
        });
        Ok(())
    }
}

#[test]
fn buffered_commands_reach_their_handler() {
    let (tx, rx) = mpsc::channel();
    let dispatcher = Dispatcher::builder()
        .register("machine/set", Recorder::new(HandlerKind::Buffered { priority: 1 }, tx))
        .expect("register")
        .build();

    assert!(dispatcher.is_buffered("machine/set"));
    for value in ["1", "2", "3"] {
        let cmd = Command::new("machine/set")
            .with_args(["velocity_ref", value])
            .with_sender("serial");
        assert_eq!(dispatcher.execute(cmd).expect("dispatch"), Dispatch::Queued);
    }

    let seen: Vec<String> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(2)).expect("queued run"))
        .collect();
    assert_eq!(
        seen,
        vec![
            "machine/set:velocity_ref:1",
            "machine/set:velocity_ref:2",
            "machine/set:velocity_ref:3"
        ]
    );
}

#[test]
fn synced_command_waits_for_completion_from_another_thread() {
    let dispatcher = Dispatcher::builder()
        .register("machine/go", Arc::new(Deferred))
        .expect("register")
        .with_config(DispatchConfig::default())
        .build();

    let started = std::time::Instant::now();
    let outcome = dispatcher
        .execute(Command::new("machine/go"))
        .expect("dispatch");

    assert_eq!(outcome, Dispatch::Completed);
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[test]
fn buffered_after_shutdown_is_refused() {
    let (tx, _rx) = mpsc::channel();
    let mut dispatcher = Dispatcher::builder()
        .register("machine/set", Recorder::new(HandlerKind::Buffered { priority: 0 }, tx))
        .expect("register")
        .build();

    dispatcher.shutdown();
    assert!(dispatcher.execute(Command::new("machine/set")).is_err());
}
