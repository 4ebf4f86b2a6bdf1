//! Error types for Gator.

use thiserror::Error;

/// Common error type for Gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Validation error for user input (argument count, URL syntax, durations).
    #[error("validation error: {0}")]
    Validation(String),

    /// No resolvable current user.
    #[error("not logged in: {0}")]
    Unauthenticated(String),

    /// Resource not found (command, user, feed, follow).
    #[error("{0} not found")]
    NotFound(String),

    /// Transport-level failure while fetching a feed.
    #[error("network error: {0}")]
    Network(String),

    /// The HTTP response could not be used.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body is not a valid feed document.
    #[error("parse error: {0}")]
    Parse(String),

    /// Storage error.
    ///
    /// Errors from sqlx are converted automatically; unique key
    /// violations are mapped to a descriptive message at the call site.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatorError {
    /// Map a sqlx error, reporting unique violations with `conflict` instead of
    /// the raw driver message.
    pub fn from_insert(e: sqlx::Error, conflict: impl FnOnce() -> String) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => GatorError::Persistence(conflict()),
            _ => GatorError::from(e),
        }
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Persistence(e.to_string())
    }
}

/// Result type alias for Gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
