//! Cross-cutting error types for Verdant.
//!
//! Domain-specific errors (`DatabaseError`, `EngineError`, ...) live in their
//! respective crates. `CoreError` covers failures raised while constructing
//! core values, before anything touches storage or inference.

use thiserror::Error;

/// Errors that can be raised by any Verdant crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A value broke a data-model invariant (score out of range, partial
    /// location, non-positive duration, ...).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A string could not be parsed into a core type.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    /// Shorthand for building a [`CoreError::ConstraintViolation`].
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }
}
