//! Client error types.

use std::fmt;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that stop the CLI before or outside a submission.
///
/// Failures of a submission itself are not errors here; they are rendered
/// as a `SubmissionResult`.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration file or value is unusable.
    Config(String),
    /// A command-line value could not be parsed.
    Usage(String),
    /// Identity provider or workspace API failure outside a submission.
    Remote(String),
    /// IO error.
    Io(std::io::Error),
    /// Tracing could not be initialized.
    Tracing(String),
    /// Opening a link failed.
    Action(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Usage(msg) => write!(f, "invalid argument: {}", msg),
            Self::Remote(msg) => write!(f, "{}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Tracing(msg) => write!(f, "tracing setup failed: {}", msg),
            Self::Action(msg) => write!(f, "action failed: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<jess_providers::RemoteError> for ClientError {
    fn from(err: jess_providers::RemoteError) -> Self {
        Self::Remote(err.to_string())
    }
}

impl From<jess_core::TracingError> for ClientError {
    fn from(err: jess_core::TracingError) -> Self {
        Self::Tracing(err.to_string())
    }
}

impl From<jess_core::ValidationError> for ClientError {
    fn from(err: jess_core::ValidationError) -> Self {
        Self::Config(err.to_string())
    }
}
