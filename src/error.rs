//! Error types for the Themis evaluation service
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for Themis operations
#[derive(Error, Debug)]
pub enum ThemisError {
    /// Caller supplied unusable input (rejected before any external call)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Completion endpoint request failed
    #[error("Completion API error: {0}")]
    Completion(String),

    /// Evaluation log operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// CSV row encode/decode failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Themis operations
pub type Result<T> = std::result::Result<T, ThemisError>;

/// Convert anyhow::Error to ThemisError
impl From<anyhow::Error> for ThemisError {
    fn from(err: anyhow::Error) -> Self {
        ThemisError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ThemisError::Validation("Conversation is required".to_string());
        assert_eq!(err.to_string(), "Validation error: Conversation is required");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing log");
        let themis_err: ThemisError = io_err.into();
        assert!(matches!(themis_err, ThemisError::Io(_)));
    }
}
