use thiserror::Error;

/// Core error type for worktrack operations.
#[derive(Error, Debug)]
pub enum WorktrackError {
    /// Bad input shape or range. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Access Policy denial.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness or cascade-blocking violation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Entity Store or Object Store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorktrackError {
    /// Build a validation error attributed to a field.
    pub fn invalid(field: &str, message: impl std::fmt::Display) -> Self {
        WorktrackError::Validation(format!("{}: {}", field, message))
    }

    /// Build a not-found error for an entity kind and id.
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        WorktrackError::NotFound(format!("{} {}", kind, id))
    }

    /// Whether this error is a uniqueness/cascade conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, WorktrackError::Conflict(_))
    }
}

impl From<serde_json::Error> for WorktrackError {
    fn from(e: serde_json::Error) -> Self {
        WorktrackError::Serialization(e.to_string())
    }
}

/// Result type alias using WorktrackError.
pub type Result<T> = std::result::Result<T, WorktrackError>;
