//! Categories, statuses, tiers, and kinds for Verdant.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`,
//! and `as_str()` returns the same string that is written to SQL columns.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;
use crate::score::Score;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Broad taxonomic bucket for a catalogue subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Tree,
    Bird,
    Insect,
    Mammal,
    Plant,
    Other,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::Tree,
        Self::Bird,
        Self::Insect,
        Self::Mammal,
        Self::Plant,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Bird => "bird",
            Self::Insect => "insect",
            Self::Mammal => "mammal",
            Self::Plant => "plant",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConservationStatus
// ---------------------------------------------------------------------------

/// IUCN-style conservation status, coarsened to the levels the catalogue tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConservationStatus {
    LeastConcern,
    NearThreatened,
    Vulnerable,
    Endangered,
    Unknown,
}

impl ConservationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeastConcern => "least_concern",
            Self::NearThreatened => "near_threatened",
            Self::Vulnerable => "vulnerable",
            Self::Endangered => "endangered",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ConservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EnvironmentalHealth
// ---------------------------------------------------------------------------

/// Qualitative health tier derived from a biodiversity score.
///
/// ```text
/// [0.00, 0.30) → poor
/// [0.30, 0.50) → fair
/// [0.50, 0.75) → good
/// [0.75, 1.00] → excellent
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentalHealth {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl EnvironmentalHealth {
    /// Map a biodiversity score onto its health tier.
    #[must_use]
    pub fn from_biodiversity(score: Score) -> Self {
        let v = score.value();
        if v < 0.3 {
            Self::Poor
        } else if v < 0.5 {
            Self::Fair
        } else if v < 0.75 {
            Self::Good
        } else {
            Self::Excellent
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

impl fmt::Display for EnvironmentalHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FindingKind
// ---------------------------------------------------------------------------

/// The four persisted finding kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    SpeciesDiscovery,
    AudioAnalysis,
    EcosystemAssessment,
    ConservationAction,
}

impl FindingKind {
    pub const ALL: [Self; 4] = [
        Self::SpeciesDiscovery,
        Self::AudioAnalysis,
        Self::EcosystemAssessment,
        Self::ConservationAction,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpeciesDiscovery => "species_discovery",
            Self::AudioAnalysis => "audio_analysis",
            Self::EcosystemAssessment => "ecosystem_assessment",
            Self::ConservationAction => "conservation_action",
        }
    }

    /// Display prefix used by [`crate::ids::FindingId`].
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::SpeciesDiscovery => crate::ids::PREFIX_DISCOVERY,
            Self::AudioAnalysis => crate::ids::PREFIX_AUDIO,
            Self::EcosystemAssessment => crate::ids::PREFIX_ECOSYSTEM,
            Self::ConservationAction => crate::ids::PREFIX_ACTION,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindingKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "species_discovery" | "discovery" | "species" => Ok(Self::SpeciesDiscovery),
            "audio_analysis" | "audio" => Ok(Self::AudioAnalysis),
            "ecosystem_assessment" | "ecosystem" => Ok(Self::EcosystemAssessment),
            "conservation_action" | "action" => Ok(Self::ConservationAction),
            other => Err(CoreError::Parse(format!("unknown finding kind '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Modality
// ---------------------------------------------------------------------------

/// One sensory input type a model variant can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Image,
    Audio,
    Text,
}

impl Modality {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Impact / Difficulty / Timeframe
// ---------------------------------------------------------------------------

/// Declared impact of a recommended action. Ordered low → very high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Impact {
    /// Integer score persisted on conservation action findings (always ≥ 1).
    #[must_use]
    pub const fn score(self) -> i64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::VeryHigh => 4,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effort needed to carry out a recommended action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

/// How soon a recommended action pays off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Immediate,
    ShortTerm,
    LongTerm,
}

// ---------------------------------------------------------------------------
// AccuracyRequirement
// ---------------------------------------------------------------------------

/// How much accuracy the caller needs from an inference request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyRequirement {
    Low,
    #[default]
    Standard,
    High,
}

impl AccuracyRequirement {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Standard => "standard",
            Self::High => "high",
        }
    }
}

impl fmt::Display for AccuracyRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccuracyRequirement {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "standard" | "normal" => Ok(Self::Standard),
            "high" => Ok(Self::High),
            other => Err(CoreError::Parse(format!(
                "unknown accuracy requirement '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

/// Network reachability reported by the host. Inference is always on-device;
/// this is recorded for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Offline,
    Metered,
    Unmetered,
}
