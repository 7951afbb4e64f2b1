//! Command dispatch for ertza.
//!
//! Transports turn whatever they receive into a [`Command`] and hand it to a
//! [`Dispatcher`], which routes it by alias to a registered [`Handler`].
//! Handlers run inline, are queued on a priority consumer, or block the
//! caller until they signal their [`Completion`].

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod queue;

pub use command::Command;
pub use config::DispatchConfig;
pub use dispatcher::{Dispatch, Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, HandlerError, Result};
pub use handler::{Completion, CompletionWaiter, Handler, HandlerKind};
pub use queue::BufferedQueue;
