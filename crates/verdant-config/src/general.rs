//! Listing limits shared by every host.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const fn default_limit() -> u32 {
    20
}

const fn default_max_limit() -> u32 {
    500
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Rows returned by a listing when the caller gives no limit.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Hard cap on any requested listing size.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl GeneralConfig {
    /// Pick the requested limit, or the default, and clamp it to `1..=max_limit`.
    #[must_use]
    pub fn clamp_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit == 0 {
            return Err(ConfigError::invalid("general.max_limit", "must be at least 1"));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigError::invalid(
                "general.default_limit",
                format!("must be within 1..={}", self.max_limit),
            ));
        }
        Ok(())
    }
}
