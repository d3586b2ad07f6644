use std::path::PathBuf;

use thiserror::Error;

/// Catalogue bootstrap failures. Raised at startup only; the catalogue is
/// read-only afterwards.
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Malformed catalogue data ({source_name}): {reason}")]
    Malformed { source_name: String, reason: String },

    #[error("Failed to read catalogue updates from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogueError {
    pub(crate) fn malformed(source_name: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}
