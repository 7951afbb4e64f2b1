use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::command::Command;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, HandlerError, Result};
use crate::handler::{Completion, Handler, HandlerKind};
use crate::queue::BufferedQueue;

/// Outcome of [`Dispatcher::execute`].
///
/// Handler failures are logged, not reported: `Ran` and `Completed` say the
/// handler was invoked, not that it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// An immediate handler ran inline.
    Ran,
    /// A buffered handler was queued.
    Queued,
    /// A synced handler signalled completion.
    Completed,
    /// A synced handler did not signal within the configured timeout.
    TimedOut,
}

/// Builds a [`Dispatcher`] from a static set of aliases.
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HashMap<String, Arc<dyn Handler>>,
    config: DispatchConfig,
}

impl DispatcherBuilder {
    /// Register a handler under `alias`.
    pub fn register(mut self, alias: impl Into<String>, handler: Arc<dyn Handler>) -> Result<Self> {
        let alias = alias.into();
        if self.handlers.contains_key(&alias) {
            return Err(DispatchError::DuplicateAlias(alias));
        }
        self.handlers.insert(alias, handler);
        Ok(self)
    }

    /// Override dispatcher config.
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Dispatcher {
        let needs_queue = self
            .handlers
            .values()
            .any(|h| matches!(h.kind(), HandlerKind::Buffered { .. }));
        Dispatcher {
            handlers: self.handlers,
            queue: needs_queue.then(BufferedQueue::start),
            config: self.config,
        }
    }
}

/// Routes commands to handlers by alias.
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn Handler>>,
    queue: Option<BufferedQueue>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Execute a command according to its handler's kind.
    ///
    /// Only an unknown alias or a closed queue is an error; anything the
    /// handler raises, panics included, is logged and swallowed.
    pub fn execute(&self, command: Command) -> Result<Dispatch> {
        let Some(handler) = self.handlers.get(&command.alias).map(Arc::clone) else {
            return Err(not_found(command));
        };

        match handler.kind() {
            HandlerKind::Immediate => {
                run_guarded(&command.alias, || {
                    handler.execute(&command, Completion::detached())
                });
                Ok(Dispatch::Ran)
            }
            HandlerKind::Buffered { priority } => {
                let queue = self.queue.as_ref().ok_or(DispatchError::QueueClosed)?;
                debug!(alias = %command.alias, priority, "queueing buffered command");
                queue.push(priority, move || {
                    run_guarded(&command.alias, || {
                        handler.execute(&command, Completion::detached())
                    });
                })?;
                Ok(Dispatch::Queued)
            }
            HandlerKind::Synced => {
                let (done, waiter) = Completion::pair(command.alias.clone());
                run_guarded(&command.alias, || handler.execute(&command, done));
                if waiter.wait(self.config.sync_timeout) {
                    Ok(Dispatch::Completed)
                } else {
                    warn!(
                        alias = %command.alias,
                        timeout = ?self.config.sync_timeout,
                        "synced command did not complete in time"
                    );
                    Ok(Dispatch::TimedOut)
                }
            }
        }
    }

    /// Invoke only the handler's synchronization hook.
    pub fn synchronize(&self, command: &Command) -> Result<()> {
        let Some(handler) = self.handlers.get(&command.alias) else {
            return Err(not_found(command.clone()));
        };
        run_guarded(&command.alias, || handler.on_sync(command));
        Ok(())
    }

    /// Every registered alias, sorted.
    pub fn available_commands(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// True if `alias` is registered as a buffered handler.
    pub fn is_buffered(&self, alias: &str) -> bool {
        self.handlers
            .get(alias)
            .is_some_and(|h| matches!(h.kind(), HandlerKind::Buffered { .. }))
    }

    /// True if `alias` is registered as a synced handler.
    pub fn is_synced(&self, alias: &str) -> bool {
        self.handlers
            .get(alias)
            .is_some_and(|h| h.kind() == HandlerKind::Synced)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Stop the buffered consumer. Queued commands that have not started are dropped.
    pub fn shutdown(&mut self) {
        if let Some(mut queue) = self.queue.take() {
            queue.shutdown();
        }
    }
}

fn not_found(command: Command) -> DispatchError {
    error!(alias = %command.alias, "alias not found in commands");
    DispatchError::AliasNotFound(Box::new(command))
}

fn run_guarded(alias: &str, f: impl FnOnce() -> std::result::Result<(), HandlerError>) {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(%alias, error = %err, "error while executing command"),
        Err(_) => error!(%alias, "handler panicked"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Counting {
        runs: AtomicUsize,
        syncs: AtomicUsize,
    }

    impl Handler for Counting {
        fn execute(&self, _: &Command, _: Completion) -> std::result::Result<(), HandlerError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_sync(&self, _: &Command) -> std::result::Result<(), HandlerError> {
            self.syncs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    impl Handler for Failing {
        fn execute(&self, cmd: &Command, _: Completion) -> std::result::Result<(), HandlerError> {
            Err(HandlerError::InvalidArguments {
                alias: cmd.alias.clone(),
                message: "missing key".to_string(),
            })
        }
    }

    struct Panicking;

    impl Handler for Panicking {
        fn kind(&self) -> HandlerKind {
            HandlerKind::Synced
        }

        fn execute(&self, _: &Command, _: Completion) -> std::result::Result<(), HandlerError> {
            panic!("handler bug")
        }
    }

    struct Holding(Mutex<Vec<Completion>>);

    impl Handler for Holding {
        fn kind(&self) -> HandlerKind {
            HandlerKind::Synced
        }

        fn execute(&self, _: &Command, done: Completion) -> std::result::Result<(), HandlerError> {
            self.0.lock().expect("lock").push(done);
            Ok(())
        }
    }

    #[test]
    fn unknown_alias_is_reported() {
        let dispatcher = Dispatcher::builder().build();
        let command = Command::new("nope")
            .with_args(["velocity_ref", "3.5"])
            .with_sender("serial");

        match dispatcher.execute(command.clone()) {
            Err(DispatchError::AliasNotFound(returned)) => assert_eq!(*returned, command),
            other => panic!("expected AliasNotFound, got {other:?}"),
        }
        match dispatcher.synchronize(&command) {
            Err(err @ DispatchError::AliasNotFound(_)) => {
                assert_eq!(err.to_string(), "alias not found: nope");
            }
            other => panic!("expected AliasNotFound, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_alias_is_rejected() {
        let result = Dispatcher::builder()
            .register("a", Arc::new(Counting::default()))
            .and_then(|b| b.register("a", Arc::new(Counting::default())));
        assert!(matches!(result, Err(DispatchError::DuplicateAlias(a)) if a == "a"));
    }

    #[test]
    fn immediate_runs_inline() {
        let handler = Arc::new(Counting::default());
        let dispatcher = Dispatcher::builder()
            .register("machine/get", handler.clone())
            .expect("register")
            .build();

        assert_eq!(
            dispatcher.execute(Command::new("machine/get")).expect("dispatch"),
            Dispatch::Ran
        );
        assert_eq!(handler.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn synchronize_calls_hook_only() {
        let handler = Arc::new(Counting::default());
        let dispatcher = Dispatcher::builder()
            .register("machine/go", handler.clone())
            .expect("register")
            .build();

        dispatcher
            .synchronize(&Command::new("machine/go"))
            .expect("synchronize");
        assert_eq!(handler.syncs.load(Ordering::SeqCst), 1);
        assert_eq!(handler.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_error_is_swallowed() {
        let dispatcher = Dispatcher::builder()
            .register("bad", Arc::new(Failing))
            .expect("register")
            .build();
        assert_eq!(
            dispatcher.execute(Command::new("bad")).expect("dispatch"),
            Dispatch::Ran
        );
    }

    #[test]
    fn panicking_synced_handler_releases_caller() {
        let dispatcher = Dispatcher::builder()
            .register("boom", Arc::new(Panicking))
            .expect("register")
            .with_config(DispatchConfig::unbounded())
            .build();
        assert_eq!(
            dispatcher.execute(Command::new("boom")).expect("dispatch"),
            Dispatch::Completed
        );
    }

    #[test]
    fn synced_times_out_when_never_signalled() {
        let handler = Arc::new(Holding(Mutex::new(Vec::new())));
        let dispatcher = Dispatcher::builder()
            .register("hold", handler.clone())
            .expect("register")
            .with_config(DispatchConfig {
                sync_timeout: Some(std::time::Duration::from_millis(20)),
            })
            .build();

        assert_eq!(
            dispatcher.execute(Command::new("hold")).expect("dispatch"),
            Dispatch::TimedOut
        );
        assert_eq!(handler.0.lock().expect("lock").len(), 1);
    }

    #[test]
    fn enumeration_and_kind_queries() {
        let dispatcher = Dispatcher::builder()
            .register("b/hold", Arc::new(Holding(Mutex::new(Vec::new()))))
            .and_then(|b| b.register("a/get", Arc::new(Counting::default())))
            .expect("register")
            .build();

        assert_eq!(dispatcher.available_commands(), vec!["a/get", "b/hold"]);
        assert!(dispatcher.is_synced("b/hold"));
        assert!(!dispatcher.is_synced("a/get"));
        assert!(!dispatcher.is_buffered("a/get"));
        assert!(!dispatcher.is_buffered("missing"));
    }
}
