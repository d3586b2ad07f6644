//! Database error types for verdant-db.

use thiserror::Error;
use verdant_core::errors::CoreError;

/// Errors from finding store operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A finding broke a data-model invariant, or referenced an unknown
    /// subject. Also raised when SQLite rejects a row on a `CHECK` or
    /// `FOREIGN KEY` constraint.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The requested finding does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A SQL query failed or returned data that could not be decoded.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// A stored preference could not be read as the requested type.
    #[error("Preference '{key}' is not a valid value: {reason}")]
    PreferenceType { key: String, reason: String },

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(libsql::Error),

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    /// Whether this error is SQLite lock contention that clears on its own.
    ///
    /// Deliberately narrow: constraint and syntax errors are never retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::LibSql(e) => {
                let msg = e.to_string().to_ascii_lowercase();
                msg.contains("database is locked")
                    || msg.contains("database table is locked")
                    || msg.contains("database is busy")
                    || msg.contains("sqlite_busy")
            }
            _ => false,
        }
    }
}

impl From<libsql::Error> for DatabaseError {
    fn from(e: libsql::Error) -> Self {
        let msg = e.to_string();
        if msg.contains("constraint failed") {
            Self::ConstraintViolation(msg)
        } else {
            Self::LibSql(e)
        }
    }
}

impl From<CoreError> for DatabaseError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::ConstraintViolation(msg) => Self::ConstraintViolation(msg),
            CoreError::Parse(msg) => Self::Query(msg),
            CoreError::Other(e) => Self::Other(e),
        }
    }
}
