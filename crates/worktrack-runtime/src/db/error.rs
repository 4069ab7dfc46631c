//! Mapping of `sqlx` failures onto the domain error taxonomy.

use tracing::error;
use worktrack_core::error::{Result, WorktrackError};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Convert a driver error. Uniqueness and restrict-blocked deletes become
/// conflicts; anything unexpected is logged and reported as a storage error.
pub(crate) fn map_sqlx(err: sqlx::Error) -> WorktrackError {
    match &err {
        sqlx::Error::RowNotFound => WorktrackError::NotFound("row not found".into()),
        sqlx::Error::Database(db) => classify(db.code().as_deref(), db.message()),
        _ => {
            error!(error = %err, "Database operation failed");
            WorktrackError::Storage(err.to_string())
        }
    }
}

/// Classify a database error by its SQLSTATE.
pub(crate) fn classify(code: Option<&str>, message: &str) -> WorktrackError {
    match code {
        Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) => {
            WorktrackError::Conflict(message.to_string())
        }
        _ => {
            error!(sqlstate = ?code, error = %message, "Database operation failed");
            WorktrackError::Storage(message.to_string())
        }
    }
}

/// A stored value that no longer parses into its domain type.
pub(crate) fn corrupt(column: &str, err: impl std::fmt::Display) -> WorktrackError {
    error!(column, error = %err, "Unreadable stored value");
    WorktrackError::Storage(format!("invalid value in {}: {}", column, err))
}

/// `.db()?` on driver results.
pub(crate) trait DbResultExt<T> {
    fn db(self) -> Result<T>;
}

impl<T> DbResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn db(self) -> Result<T> {
        self.map_err(map_sqlx)
    }
}
