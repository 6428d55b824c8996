//! Error types for the mediation layer
//!
//! Ad lifecycle failures (load, display) never surface here: they are
//! absorbed by the coordinators and reported to delegates and analytics.
//! This type only covers configuration and coordinator queries.

use thiserror::Error;

/// Result type for mediation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Mediation errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Concurrency error (coordinator mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error payload reported by the ad provider SDK
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("ad provider error {code}: {message}")]
pub struct AdError {
    /// Provider error code
    pub code: i64,

    /// Human-readable message
    pub message: String,
}

impl AdError {
    /// Create new provider error
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_error_display() {
        let err = AdError::new(-1009, "no fill");
        assert_eq!(err.to_string(), "ad provider error -1009: no fill");
    }

    #[test]
    fn test_concurrency_error_display() {
        let err = Error::Concurrency("Coordinator mailbox closed".to_string());
        assert_eq!(
            err.to_string(),
            "Concurrency error: Coordinator mailbox closed"
        );
    }
}
