//! Finding store configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_path() -> String {
    ".verdant/verdant.db".to_string()
}

const fn default_max_attempts() -> u32 {
    4
}

const fn default_base_delay_ms() -> u64 {
    50
}

const fn default_max_delay_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Path to the libSQL database file, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,

    /// Attempts per write (including the first) on transient lock errors.
    #[serde(default = "default_max_attempts")]
    pub max_write_attempts: u32,

    /// Delay before the first retry; doubles on each further attempt.
    #[serde(default = "default_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Upper bound for the backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            max_write_attempts: default_max_attempts(),
            retry_base_delay_ms: default_base_delay_ms(),
            retry_max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::invalid("store.path", "must not be empty"));
        }
        if self.max_write_attempts == 0 {
            return Err(ConfigError::invalid(
                "store.max_write_attempts",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
