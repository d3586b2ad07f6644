//! Reference catalogue configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogueConfig {
    /// Optional TOML file whose subjects are merged over the built-in seed.
    #[serde(default)]
    pub updates_path: String,
}

impl CatalogueConfig {
    #[must_use]
    pub fn has_updates(&self) -> bool {
        !self.updates_path.trim().is_empty()
    }
}
