//! Error types for device service queries.

use thiserror::Error;

/// Errors that can occur when querying the device service.
///
/// These are returned as values so the poll loop can keep the last good
/// data and carry on ticking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// No response: host unreachable, connection refused, timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a failure status.
    #[error("Service error ({status}): {detail}")]
    Service { status: u16, detail: String },

    /// The session was rejected. Not retried; polling stops.
    #[error("Not authorized: {0}")]
    Auth(String),

    /// The service answered successfully but the body could not be parsed.
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether this error invalidates the session.
    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Auth(_))
    }

    /// Short category name for display.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Service { .. } => "service",
            FetchError::Auth(_) => "auth",
            FetchError::Decode(_) => "decode",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Service {
                status: status.as_u16(),
                detail: err.to_string(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = FetchError::Service {
            status: 503,
            detail: "nvml unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Service error (503): nvml unavailable");
        assert_eq!(FetchError::Network("refused".into()).to_string(), "Network error: refused");
    }

    #[test]
    fn test_is_auth() {
        assert!(FetchError::Auth("expired".into()).is_auth());
        assert!(!FetchError::Decode("bad json".into()).is_auth());
        assert_eq!(FetchError::Auth("expired".into()).kind(), "auth");
    }
}
