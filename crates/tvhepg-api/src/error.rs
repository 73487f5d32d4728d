//! Error types for TVHeadend API calls.
//!
//! Every failure carries an [`ApiErrorKind`] so callers can react to the
//! category (bad credentials, unreachable server, server-side error) without
//! matching on transport details.

use std::fmt;
use thiserror::Error;

/// The category of an API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The server rejected the credentials (HTTP 401).
    Authentication,
    /// The server could not be reached: timeout, DNS, refused connection, TLS.
    Connection,
    /// The server answered with a non-success status other than 401.
    Request,
    /// The server answered 2xx but the body could not be decoded.
    InvalidResponse,
    /// The client was given an unusable URL or credentials.
    Configuration,
}

impl ApiErrorKind {
    /// Returns a stable machine-readable name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Connection => "connection",
            Self::Request => "request",
            Self::InvalidResponse => "invalid_response",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error returned by [`TvhClient`](crate::TvhClient).
#[derive(Debug, Error)]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    /// HTTP status, for `Request` and `Authentication` errors.
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Credentials rejected.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authentication, message).with_status(401)
    }

    /// Server unreachable.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Connection, message)
    }

    /// The request timed out.
    pub fn timeout() -> Self {
        Self::connection("connection timed out")
    }

    /// Non-success HTTP status.
    pub fn request(status: u16, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Request, message).with_status(status)
    }

    /// Undecodable response body.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidResponse, message)
    }

    /// Unusable client configuration.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Configuration, message)
    }

    /// Sets the HTTP status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A specialized Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(ApiErrorKind::Authentication.as_str(), "authentication");
        assert_eq!(ApiErrorKind::InvalidResponse.to_string(), "invalid_response");
    }

    #[test]
    fn authentication_carries_401() {
        let err = ApiError::authentication("invalid username or password");
        assert_eq!(err.kind(), ApiErrorKind::Authentication);
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn timeout_is_a_connection_error() {
        let err = ApiError::timeout();
        assert_eq!(err.kind(), ApiErrorKind::Connection);
        assert!(err.message().contains("timed out"));
        assert!(err.status().is_none());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = ApiError::request(503, "service unavailable");
        assert_eq!(err.to_string(), "request: service unavailable");
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn with_source_exposes_cause() {
        use std::error::Error;
        let io_err = std::io::Error::other("connection reset");
        let err = ApiError::connection("read failed").with_source(io_err);
        assert!(err.source().is_some());
    }
}
