//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Missing or invalid configuration, fatal at startup
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong with the configuration
        message: String,
    },

    /// API request rejected with a non-success HTTP status
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message reported by the service
        message: String,
    },

    /// Error object delivered inside the response stream
    #[error("Remote error: {status} ({code}) - {message}")]
    RemoteError {
        /// Numeric error code
        code: i64,
        /// Symbolic status, e.g. `RESOURCE_EXHAUSTED`
        status: String,
        /// Human-readable message
        message: String,
    },

    /// The prompt was blocked by the service before generation
    #[error("Prompt blocked: {reason}")]
    BlockedError {
        /// Block reason reported by the service
        reason: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        /// Underlying transport failure
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        /// What could not be understood
        message: String,
    },

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl TranslationError {
    /// Whether this error belongs to the fatal configuration class.
    ///
    /// Everything else is a per-request transport failure that leaves the
    /// process running.
    pub fn is_configuration(&self) -> bool {
        matches!(self, TranslationError::ConfigError { .. })
    }

    /// Shorthand for [`TranslationError::ConfigError`]
    pub(crate) fn config(message: impl Into<String>) -> Self {
        TranslationError::ConfigError {
            message: message.into(),
        }
    }

    /// Shorthand for [`TranslationError::InvalidResponseError`]
    pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
        TranslationError::InvalidResponseError {
            message: message.into(),
        }
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
