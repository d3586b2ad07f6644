//! Inference tasks and the device context they run under.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use verdant_core::enums::{AccuracyRequirement, Connectivity, Modality};
use verdant_core::score::Score;

/// What the caller wants done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    IdentifySpecies,
    AnalyzeAudio,
    AssessEcosystem,
}

impl TaskKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdentifySpecies => "identify_species",
            Self::AnalyzeAudio => "analyze_audio",
            Self::AssessEcosystem => "assess_ecosystem",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inference request as the registry sees it: the modalities it needs and
/// how accurate the answer has to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub modalities: BTreeSet<Modality>,
    pub accuracy: AccuracyRequirement,
}

impl Task {
    #[must_use]
    pub fn identify_species(accuracy: AccuracyRequirement) -> Self {
        Self {
            kind: TaskKind::IdentifySpecies,
            modalities: BTreeSet::from([Modality::Image]),
            accuracy,
        }
    }

    #[must_use]
    pub fn analyze_audio(accuracy: AccuracyRequirement) -> Self {
        Self {
            kind: TaskKind::AnalyzeAudio,
            modalities: BTreeSet::from([Modality::Audio]),
            accuracy,
        }
    }

    /// Ecosystem assessment over whichever captures are present.
    #[must_use]
    pub fn assess_ecosystem(has_image: bool, has_audio: bool, accuracy: AccuracyRequirement) -> Self {
        let mut modalities = BTreeSet::new();
        if has_image {
            modalities.insert(Modality::Image);
        }
        if has_audio {
            modalities.insert(Modality::Audio);
        }
        Self {
            kind: TaskKind::AssessEcosystem,
            modalities,
            accuracy,
        }
    }
}

/// Resource snapshot supplied by the host with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceContext {
    /// Remaining charge as a fraction of full.
    pub battery_level: Score,
    pub is_plugged_in: bool,
    /// Recorded for diagnostics; inference never leaves the device.
    #[serde(default)]
    pub connectivity: Connectivity,
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self {
            battery_level: Score::ONE,
            is_plugged_in: false,
            connectivity: Connectivity::Offline,
        }
    }
}
