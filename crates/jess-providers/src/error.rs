//! Error types for remote calendar and mail operations.
//!
//! Every failure coming out of the identity provider or the workspace API is
//! a [`RemoteError`]. The flows never retry; the error's message is shown to
//! the user as-is.

use std::fmt;
use thiserror::Error;

/// The category of a remote error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorCode {
    /// Credentials are missing, invalid or expired.
    AuthenticationFailed,
    /// The session lacks permission (missing scope, wrong mailbox).
    AuthorizationFailed,
    /// Connection failed, timed out, or DNS resolution failed.
    NetworkError,
    /// Quota or rate limit exceeded.
    RateLimited,
    /// The provider returned a 5xx status.
    ServerError,
    /// The response could not be parsed.
    InvalidResponse,
    /// Calendar or mailbox not found (404).
    NotFound,
    /// The provider rejected the request body (400).
    BadRequest,
    /// Local configuration is missing or invalid.
    ConfigurationError,
    /// Unexpected internal state.
    InternalError,
}

impl RemoteErrorCode {
    /// Returns true if the failure is transient.
    ///
    /// Informational only: submissions are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure from the identity provider or the remote workspace API.
#[derive(Debug, Error)]
pub struct RemoteError {
    code: RemoteErrorCode,
    message: String,
    /// The client that produced this error, e.g. "google".
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RemoteError {
    /// Creates a new remote error with the given code and message.
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::AuthenticationFailed, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::AuthorizationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::BadRequest, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::InternalError, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> RemoteErrorCode {
        self.code
    }

    /// Returns the provider-supplied reason.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns true if this error is transient.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_retryable() {
        assert!(RemoteErrorCode::NetworkError.is_retryable());
        assert!(RemoteErrorCode::RateLimited.is_retryable());
        assert!(RemoteErrorCode::ServerError.is_retryable());
        assert!(!RemoteErrorCode::AuthenticationFailed.is_retryable());
        assert!(!RemoteErrorCode::BadRequest.is_retryable());
    }

    #[test]
    fn error_code_display() {
        assert_eq!(
            RemoteErrorCode::AuthorizationFailed.to_string(),
            "authorization_failed"
        );
        assert_eq!(RemoteErrorCode::NotFound.as_str(), "not_found");
    }

    #[test]
    fn remote_error_creation() {
        let err = RemoteError::authentication("token expired");
        assert_eq!(err.code(), RemoteErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "token expired");
        assert!(err.provider().is_none());
        assert!(!err.is_retryable());
    }

    #[test]
    fn remote_error_display() {
        let err = RemoteError::rate_limited("Quota exceeded for quota metric").with_provider("google");
        let display = err.to_string();
        assert!(display.starts_with("[google] "));
        assert!(display.contains("rate_limited"));
        assert!(display.contains("Quota exceeded"));
    }

    #[test]
    fn remote_error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = RemoteError::configuration("failed to write token file").with_source(io_err);
        assert!(err.source().is_some());
    }
}
