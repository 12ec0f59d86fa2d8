use std::time::Duration;
use thiserror::Error;

/// Failures that can stop a single dispatch.
///
/// Each variant maps onto one exit classification at the dispatcher
/// boundary; none of them ever escapes as a process abort.
#[derive(Error, Debug)]
pub enum BexError {
    /// Malformed config file, unknown flag or unparseable environment value.
    #[error("{0}")]
    Configuration(String),

    /// Missing required option or a value that violates a domain constraint.
    #[error("{0}")]
    Validation(String),

    /// The symbolic command name is not registered.
    #[error("command not found: {0}")]
    Resolution(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures on the remote-service side of a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("could not connect to {server}: {reason}")]
    ConnectionFailed { server: String, reason: String },

    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("no response from server within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, BexError>;
