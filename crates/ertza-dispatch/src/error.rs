use crate::command::Command;

/// Errors returned by the dispatcher itself.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No handler is registered under this alias. The rejected command is
    /// handed back untouched.
    #[error("alias not found: {}", .0.alias)]
    AliasNotFound(Box<Command>),

    /// A handler is already registered under this alias.
    #[error("duplicate alias: {0}")]
    DuplicateAlias(String),

    /// The buffered queue has been shut down.
    #[error("buffered queue is closed")]
    QueueClosed,
}

/// Errors raised by handlers. The dispatcher logs these and never
/// propagates them to the caller.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The command carried unusable arguments.
    #[error("invalid arguments for {alias}: {message}")]
    InvalidArguments { alias: String, message: String },

    /// The handler could not complete its work.
    #[error("{0}")]
    Failed(String),

    /// Any other error surfaced by the handler's collaborators.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
