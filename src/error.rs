//! Error types for Feedloom.

use thiserror::Error;

/// Common error type for Feedloom.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success HTTP status that is not a throttle signal.
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Response body, truncated for diagnostics.
        body: String,
    },

    /// Malformed feed or payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for input data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Bug inside the engine, such as a panic caught while processing a source.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for IngestError {
    fn from(e: sqlx::Error) -> Self {
        IngestError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IngestError::Http(format!("request timed out: {}", e))
        } else {
            IngestError::Http(e.to_string())
        }
    }
}

/// Result type alias for Feedloom operations.
pub type Result<T> = std::result::Result<T, IngestError>;
