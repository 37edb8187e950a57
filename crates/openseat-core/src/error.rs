//! Error types for the openseat monitor
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the openseat monitor
#[derive(Error, Debug)]
pub enum Error {
    /// Availability lookup errors (transport, upstream, parsing)
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No configured target could be resolved at startup
    #[error("No valid targets to monitor")]
    NoValidTargets,

    /// A port call did not complete within its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream payload could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Target not found upstream
    #[error("Not found: {0}")]
    NotFound(String),

    /// Adapter-specific error
    #[error("Adapter error ({adapter}): {message}")]
    Adapter {
        /// Adapter name
        adapter: String,
        /// Error message
        message: String,
    },

    /// I/O errors (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a lookup error
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an adapter-specific error
    pub fn adapter(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Adapter {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    /// Whether the failure is transient and worth observing again next cycle.
    ///
    /// The engine keeps polling a pending target regardless; this only feeds
    /// diagnostics.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Lookup(_)
                | Self::Timeout(_)
                | Self::Http(_)
                | Self::Parse(_)
                | Self::RateLimited(_)
                | Self::Adapter { .. }
                | Self::Io(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(Error::http("connection reset").is_retryable());
        assert!(Error::timeout("lookup 12345").is_retryable());
        assert!(Error::adapter("timetable", "503").is_retryable());
    }

    #[test]
    fn setup_errors_are_not_retryable() {
        assert!(!Error::config("no targets").is_retryable());
        assert!(!Error::NoValidTargets.is_retryable());
        assert!(!Error::auth("bad key").is_retryable());
    }

    #[test]
    fn adapter_error_display_names_adapter() {
        let err = Error::adapter("resend", "422 Unprocessable Entity");
        assert_eq!(
            err.to_string(),
            "Adapter error (resend): 422 Unprocessable Entity"
        );
    }
}
