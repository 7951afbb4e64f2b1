use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use tracing::warn;

use crate::command::Command;
use crate::error::HandlerError;

/// How the dispatcher runs a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerKind {
    /// Runs inline on the caller's thread.
    #[default]
    Immediate,
    /// Queued on the buffered consumer. Lower priorities run first.
    Buffered { priority: i32 },
    /// Runs inline, then blocks the caller until the handler signals its
    /// [`Completion`].
    Synced,
}

/// A command handler registered under one or more aliases.
pub trait Handler: Send + Sync {
    /// Execution kind. Defaults to [`HandlerKind::Immediate`].
    fn kind(&self) -> HandlerKind {
        HandlerKind::Immediate
    }

    /// Execute a command.
    ///
    /// Synced handlers release the waiting caller by completing (or dropping)
    /// `done`, possibly from another thread. Other kinds may ignore it.
    fn execute(&self, command: &Command, done: Completion) -> Result<(), HandlerError>;

    /// Synchronization hook, invoked without executing the command.
    fn on_sync(&self, _command: &Command) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// One-shot completion signal handed to a handler.
///
/// Dropping it without calling [`Completion::complete`] still releases the
/// waiter, so a failed handler cannot stall its caller.
#[derive(Debug)]
pub struct Completion {
    tx: Option<SyncSender<()>>,
    alias: String,
}

impl Completion {
    /// Create a linked signal and waiter pair.
    pub fn pair(alias: impl Into<String>) -> (Completion, CompletionWaiter) {
        let (tx, rx) = mpsc::sync_channel(1);
        (
            Completion {
                tx: Some(tx),
                alias: alias.into(),
            },
            CompletionWaiter { rx },
        )
    }

    /// A signal nobody waits on.
    pub fn detached() -> Completion {
        Completion {
            tx: None,
            alias: String::new(),
        }
    }

    /// Release the waiter.
    pub fn complete(mut self) {
        if let Some(tx) = self.tx.take() {
            // The waiter may have timed out already.
            let _ = tx.send(());
        }
    }

    /// True if a caller is waiting on this signal.
    pub fn is_awaited(&self) -> bool {
        self.tx.is_some()
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            warn!(alias = %self.alias, "completion dropped without being signalled");
            let _ = tx.send(());
        }
    }
}

/// Waiting half of a [`Completion`].
#[derive(Debug)]
pub struct CompletionWaiter {
    rx: Receiver<()>,
}

impl CompletionWaiter {
    /// Block until the completion is signalled or dropped.
    ///
    /// Returns `false` if `timeout` elapsed first. `None` waits forever.
    pub fn wait(self, timeout: Option<Duration>) -> bool {
        match timeout {
            None => {
                // A disconnect means the completion was dropped: also released.
                let _ = self.rx.recv();
                true
            }
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
                Err(RecvTimeoutError::Timeout) => false,
            },
        }
    }
}
