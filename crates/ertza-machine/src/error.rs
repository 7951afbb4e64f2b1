use crate::roster::RemoteSendError;
use crate::value::Value;

/// Errors raised by the parameter map boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    /// No parameter with this name.
    #[error("unknown parameter: {0}")]
    Unknown(String),

    /// The parameter cannot be written.
    #[error("parameter {0} is read-only")]
    ReadOnly(String),

    /// The drive frontend rejected the value.
    #[error("invalid value for {key}: {message}")]
    Rejected { key: String, message: String },
}

/// Errors raised while resolving per-slave configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// No `slave_<serial>` section exists.
    #[error("no config found for slave {0}")]
    ConfigSectionNotFound(String),

    /// A `<param>_value` entry is not a number.
    #[error("invalid value for {key} in slave {serial}: {found}")]
    InvalidValue {
        serial: String,
        key: String,
        found: String,
    },
}

/// Errors raised while computing or sending a forwarded value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForwardError {
    #[error("unrecognized mode {mode} for {key}")]
    InvalidTransformMode { mode: String, key: String },

    #[error("no value configured for {key} in slave {serial}")]
    MissingTransformValue { serial: String, key: String },

    #[error("no value returned for {serial} ({key} asked)")]
    NoForwardValue { serial: String, key: String },

    #[error("division by zero while forwarding {key}")]
    DivisionByZero { key: String },

    #[error("cannot transform non-numeric value {value} for {key}")]
    NonNumeric { key: String, value: Value },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to send {key} to slave {serial}: {source}")]
    Send {
        serial: String,
        key: String,
        #[source]
        source: RemoteSendError,
    },
}

/// Errors surfaced by the machine mode layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MachineError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Forward(#[from] ForwardError),

    /// The operation needs master mode.
    #[error("machine is not in master mode")]
    NotMaster,
}

pub type Result<T> = std::result::Result<T, MachineError>;
