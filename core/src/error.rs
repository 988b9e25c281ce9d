//! Structured error types for portalkeep
//!
//! The classifier on [`PortalError`] drives the orchestrator's retry
//! decisions: transport and protocol failures are transient from the
//! client's point of view, configuration problems are not.

use std::time::Duration;
use thiserror::Error;

/// Primary error type for portal operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// Network/connection error
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Transport-level timeout
    #[error("request timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The portal answered with a status we did not expect
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Redirect landed somewhere we cannot interpret
    #[error("invalid redirect target: {location}")]
    InvalidRedirect { location: String },

    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Missing required config
    #[error("missing required configuration: {key}")]
    MissingConfig { key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PortalError {
    /// Check if error is retryable (transient)
    ///
    /// Protocol-level surprises count as retryable because a captive portal
    /// hiccup is indistinguishable from a real rejection on the wire.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } => true,
            Self::Timeout { .. } => true,
            Self::UnexpectedStatus { .. } => true,
            Self::InvalidRedirect { .. } => true,

            Self::InvalidConfig { .. } | Self::MissingConfig { .. } => false,

            Self::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
        }
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                duration: crate::http::REQUEST_TIMEOUT,
            }
        } else {
            Self::ConnectionFailed {
                message: err.to_string(),
            }
        }
    }
}

/// Result type alias using PortalError
pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PortalError::Timeout {
            duration: Duration::from_secs(20)
        }
        .is_retryable());

        assert!(PortalError::ConnectionFailed {
            message: "connection refused".to_string()
        }
        .is_retryable());

        assert!(PortalError::UnexpectedStatus {
            status: 503,
            url: "http://portal.example/login".to_string()
        }
        .is_retryable());

        assert!(!PortalError::MissingConfig {
            key: "username".to_string()
        }
        .is_retryable());
    }
}
