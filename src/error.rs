//! Error types for the WattTime client.

use thiserror::Error;

/// The main error type for the WattTime client.
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (config files, exports, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication errors (missing token, 401/403 responses)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid caller input (naive timestamps, bad ranges, bad intervals)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport-level failures
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// Rate limiting errors
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),

    /// Malformed response payloads
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Alias for Result with our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new auth error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a new validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new service error.
    pub fn service(status: u16, msg: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: msg.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is recoverable (the request can be retried).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) => true,
            Self::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::RateLimited(3).is_recoverable());
        assert!(Error::service(503, "unavailable").is_recoverable());
        assert!(!Error::service(404, "not found").is_recoverable());
        assert!(!Error::auth("bad token").is_recoverable());
        assert!(!Error::validation("start >= end").is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = Error::service(500, "boom");
        assert_eq!(err.to_string(), "Service error (500): boom");
        assert_eq!(
            Error::auth("token required").to_string(),
            "Authentication error: token required"
        );
    }
}
