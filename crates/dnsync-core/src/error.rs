//! Error types for dnsync
//!
//! Every failure the reconciliation core can produce is a variant of [`Error`].
//! The engine relies on [`Error::is_retryable`] to decide whether a provider
//! call is worth another attempt.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dnsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dnsync
#[derive(Error, Debug)]
pub enum Error {
    /// The persisted configuration file does not exist
    #[error("Configuration not found at {}. Run `dnsync init` first.", .path.display())]
    ConfigMissing {
        /// Path that was looked up
        path: PathBuf,
    },

    /// The configuration exists but cannot be used
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The desired-state input file does not exist
    #[error("Address file not found: {}", .path.display())]
    FileMissing {
        /// Path that was looked up
        path: PathBuf,
    },

    /// A line of the desired-state file is not an IP address literal
    #[error("Line {line}: '{content}' is not a valid IP address ({reason})")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Trimmed line content
        content: String,
        /// Parser message
        reason: String,
    },

    /// Credentials were rejected by the provider
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The provider asked us to slow down
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Transport failure or provider-side 5xx
    #[error("Network error: {0}")]
    Network(String),

    /// The provider refused to create more records
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Record (or zone) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error that fits no other category
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Local I/O errors
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
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a quota error
    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether another attempt of the same call may succeed
    ///
    /// Only rate limiting and network failures are transient. Everything
    /// else (auth, quota, malformed responses) will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Network(_))
    }

    /// Whether this error must stop the run before any mutation
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing { .. }
                | Self::ConfigInvalid(_)
                | Self::FileMissing { .. }
                | Self::Parse { .. }
                | Self::Auth(_)
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
    fn only_transient_errors_are_retryable() {
        assert!(Error::rate_limited("429").is_retryable());
        assert!(Error::network("connection reset").is_retryable());

        assert!(!Error::auth("bad key").is_retryable());
        assert!(!Error::quota_exceeded("too many records").is_retryable());
        assert!(!Error::not_found("gone").is_retryable());
        assert!(!Error::provider("cloudflare", "weird").is_retryable());
    }

    #[test]
    fn parse_error_names_the_line() {
        let err = Error::Parse {
            line: 3,
            content: "10.0.0.256".to_string(),
            reason: "invalid IP address syntax".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Line 3"));
        assert!(msg.contains("10.0.0.256"));
    }

    #[test]
    fn auth_is_fatal_rate_limit_is_not() {
        assert!(Error::auth("403").is_fatal_for_run());
        assert!(!Error::rate_limited("429").is_fatal_for_run());
    }
}
