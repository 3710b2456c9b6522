//! Error types for rowver operations.

use thiserror::Error;

/// Result type alias for rowver operations.
pub type RowverResult<T> = Result<T, RowverError>;

/// Main error type for all rowver operations.
///
/// Recording failures surface at the same call site as the triggering
/// entity write; there is no separate error channel.
#[derive(Error, Debug)]
pub enum RowverError {
    /// Version table could not be created.
    #[error("Schema error: {message}")]
    Schema {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Version log query or insert failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RowverError {
    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            source: None,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for RowverError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = RowverError::validation("bad table name");
        assert!(err.to_string().contains("bad table name"));
    }

    #[test]
    fn test_sqlite_error_maps_to_database() {
        let err: RowverError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, RowverError::Database { .. }));
    }
}
