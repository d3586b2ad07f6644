//! Engine error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use verdant_catalog::CatalogueError;
use verdant_config::ConfigError;
use verdant_core::enums::Modality;
use verdant_core::errors::CoreError;
use verdant_db::DatabaseError;
use verdant_models::RegistryError;

use crate::orchestrator::{PendingFinding, Stage};
use crate::pipeline::PipelineError;

/// Errors surfaced by the orchestrator and [`crate::VerdantContext`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input or a computed finding broke a data-model invariant.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Registry selection failed, or the registry itself is malformed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A pipeline did not answer within the per-modality timeout.
    #[error("{modality} pipeline timed out after {timeout_ms} ms")]
    ModalityTimeout { modality: Modality, timeout_ms: u64 },

    /// A pipeline returned an error.
    #[error("{modality} pipeline failed: {source}")]
    Pipeline {
        modality: Modality,
        #[source]
        source: PipelineError,
    },

    /// The modalities that did answer left nothing to build a finding from.
    #[error("Insufficient modality data: {0}")]
    InsufficientModalityData(String),

    /// The result was computed but the store rejected it. `pending` holds the
    /// finished result for [`crate::VerdantContext::retry_persist`].
    #[error("Failed to persist finding: {source}")]
    PersistenceFailed {
        pending: Box<PendingFinding>,
        #[source]
        source: DatabaseError,
    },

    /// The caller cancelled the request before anything was written.
    #[error("Request cancelled during {stage}")]
    Cancelled { stage: Stage },

    /// Store error outside the processing path (queries, preferences, ...).
    #[error(transparent)]
    Store(#[from] DatabaseError),

    /// Startup only.
    #[error("Catalogue bootstrap failed: {0}")]
    CatalogueBootstrap(#[from] CatalogueError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<CoreError> for EngineError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::ConstraintViolation(msg) | CoreError::Parse(msg) => {
                Self::ConstraintViolation(msg)
            }
            CoreError::Other(e) => Self::Store(DatabaseError::Other(e)),
        }
    }
}

/// Stable error-kind names for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConstraintViolation,
    NoCapableVariant,
    ModalityTimeout,
    InsufficientModalityData,
    PersistenceFailed,
    CatalogueBootstrapError,
    Cancelled,
    NotFound,
    Pipeline,
    Storage,
    Config,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConstraintViolation => "constraint_violation",
            Self::NoCapableVariant => "no_capable_variant",
            Self::ModalityTimeout => "modality_timeout",
            Self::InsufficientModalityData => "insufficient_modality_data",
            Self::PersistenceFailed => "persistence_failed",
            Self::CatalogueBootstrapError => "catalogue_bootstrap_error",
            Self::Cancelled => "cancelled",
            Self::NotFound => "not_found",
            Self::Pipeline => "pipeline",
            Self::Storage => "storage",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConstraintViolation(_) | Self::Store(DatabaseError::ConstraintViolation(_)) => {
                ErrorKind::ConstraintViolation
            }
            Self::Registry(RegistryError::NoCapableVariant { .. }) => ErrorKind::NoCapableVariant,
            Self::Registry(RegistryError::Malformed(_)) | Self::Config(_) => ErrorKind::Config,
            Self::ModalityTimeout { .. } => ErrorKind::ModalityTimeout,
            Self::Pipeline { .. } => ErrorKind::Pipeline,
            Self::InsufficientModalityData(_) => ErrorKind::InsufficientModalityData,
            Self::PersistenceFailed { .. } => ErrorKind::PersistenceFailed,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Store(DatabaseError::NotFound(_)) => ErrorKind::NotFound,
            Self::Store(_) => ErrorKind::Storage,
            Self::CatalogueBootstrap(_) => ErrorKind::CatalogueBootstrapError,
        }
    }

    /// The computed result held by a [`EngineError::PersistenceFailed`].
    #[must_use]
    pub fn into_pending(self) -> Option<PendingFinding> {
        match self {
            Self::PersistenceFailed { pending, .. } => Some(*pending),
            _ => None,
        }
    }
}
