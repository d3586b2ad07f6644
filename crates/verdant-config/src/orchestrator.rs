//! Inference orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_modality_timeout_ms() -> u64 {
    5_000
}

const fn default_low_battery_threshold() -> f64 {
    0.2
}

const fn default_separation_margin() -> f64 {
    0.05
}

const fn default_ambiguity_cap() -> f64 {
    0.6
}

const fn default_persist_actions() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Per-pipeline timeout before a modality counts as stalled.
    #[serde(default = "default_modality_timeout_ms")]
    pub modality_timeout_ms: u64,

    /// Battery level (0..1) below which cheap variants are preferred.
    #[serde(default = "default_low_battery_threshold")]
    pub low_battery_threshold: f64,

    /// Minimum lead the top species candidate needs over the runner-up.
    #[serde(default = "default_separation_margin")]
    pub separation_margin: f64,

    /// Confidence ceiling applied when the lead is below the margin.
    #[serde(default = "default_ambiguity_cap")]
    pub ambiguity_cap: f64,

    /// Store recommended actions as conservation-action findings.
    #[serde(default = "default_persist_actions")]
    pub persist_actions: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            modality_timeout_ms: default_modality_timeout_ms(),
            low_battery_threshold: default_low_battery_threshold(),
            separation_margin: default_separation_margin(),
            ambiguity_cap: default_ambiguity_cap(),
            persist_actions: default_persist_actions(),
        }
    }
}

impl OrchestratorConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.modality_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "orchestrator.modality_timeout_ms",
                "must be greater than zero",
            ));
        }
        for (field, value) in [
            ("orchestrator.low_battery_threshold", self.low_battery_threshold),
            ("orchestrator.separation_margin", self.separation_margin),
            ("orchestrator.ambiguity_cap", self.ambiguity_cap),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(field, format!("{value} is outside [0, 1]")));
            }
        }
        Ok(())
    }
}
