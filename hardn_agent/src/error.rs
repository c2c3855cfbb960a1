//! Error kinds shared by the collectors, the control executor and the API layer.

use std::time::Duration;

use thiserror::Error;

/// Failure to obtain a result from an external command.
///
/// A nonzero exit status is *not* one of these: it is a normal
/// [`CommandOutput`](crate::runner::CommandOutput) that the caller inspects.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("`{program}` timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error while waiting for `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A control request that was refused before anything was executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid JSON data")]
    InvalidBody,
    #[error("Missing service or action parameter")]
    MissingField,
    #[error("Service {0} not allowed")]
    ServiceNotAllowed(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

/// Why the executor refused to act.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Failure to produce a metrics reading on one tick.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("metrics source unavailable: {0}")]
    Unavailable(String),
    #[error("incomplete reading: {0}")]
    Incomplete(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}
