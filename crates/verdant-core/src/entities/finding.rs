use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::audio::check_duration;
use crate::entities::{AudioAnalysis, ConservationAction, EcosystemAssessment, SpeciesDiscovery};
use crate::enums::FindingKind;
use crate::errors::CoreError;
use crate::ids::FindingId;
use crate::location::Location;

/// Any of the four finding kinds.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    SpeciesDiscovery(SpeciesDiscovery),
    AudioAnalysis(AudioAnalysis),
    EcosystemAssessment(EcosystemAssessment),
    ConservationAction(ConservationAction),
}

impl Finding {
    #[must_use]
    pub const fn kind(&self) -> FindingKind {
        match self {
            Self::SpeciesDiscovery(_) => FindingKind::SpeciesDiscovery,
            Self::AudioAnalysis(_) => FindingKind::AudioAnalysis,
            Self::EcosystemAssessment(_) => FindingKind::EcosystemAssessment,
            Self::ConservationAction(_) => FindingKind::ConservationAction,
        }
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::SpeciesDiscovery(f) => f.created_at,
            Self::AudioAnalysis(f) => f.created_at,
            Self::EcosystemAssessment(f) => f.created_at,
            Self::ConservationAction(f) => f.created_at,
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::SpeciesDiscovery(f) => f.location.as_ref(),
            Self::AudioAnalysis(f) => f.location.as_ref(),
            Self::EcosystemAssessment(f) => f.location.as_ref(),
            Self::ConservationAction(f) => f.location.as_ref(),
        }
    }

    /// Every catalogue subject this finding points at.
    #[must_use]
    pub fn subject_refs(&self) -> Vec<&str> {
        match self {
            Self::SpeciesDiscovery(f) => vec![f.subject_ref.as_str()],
            Self::AudioAnalysis(f) => f.detected_subjects.iter().map(String::as_str).collect(),
            Self::EcosystemAssessment(_) => Vec::new(),
            Self::ConservationAction(f) => f.related_subject_ref.as_deref().into_iter().collect(),
        }
    }

    /// Recommendation strings attached to the finding (empty for actions).
    #[must_use]
    pub fn recommendations(&self) -> &[String] {
        match self {
            Self::SpeciesDiscovery(f) => &f.recommendations,
            Self::AudioAnalysis(f) => &f.recommendations,
            Self::EcosystemAssessment(f) => &f.recommendations,
            Self::ConservationAction(_) => &[],
        }
    }

    /// Replace the attached recommendation strings. No-op for actions.
    pub fn set_recommendations(&mut self, recommendations: Vec<String>) {
        match self {
            Self::SpeciesDiscovery(f) => f.recommendations = recommendations,
            Self::AudioAnalysis(f) => f.recommendations = recommendations,
            Self::EcosystemAssessment(f) => f.recommendations = recommendations,
            Self::ConservationAction(_) => {}
        }
    }

    /// Re-check the invariants that the type system does not carry.
    ///
    /// Scores and locations are already valid by construction; this covers
    /// durations, impact scores, and blank identifiers on values that may have
    /// been assembled field by field.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` on the first broken invariant.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::SpeciesDiscovery(f) => {
                if f.subject_ref.trim().is_empty() {
                    return Err(CoreError::constraint("discovery subject_ref must not be blank"));
                }
                Ok(())
            }
            Self::AudioAnalysis(f) => check_duration(f.duration_seconds),
            Self::EcosystemAssessment(f) => f.validate(),
            Self::ConservationAction(f) => f.validate(),
        }
    }
}

impl From<SpeciesDiscovery> for Finding {
    fn from(value: SpeciesDiscovery) -> Self {
        Self::SpeciesDiscovery(value)
    }
}

impl From<AudioAnalysis> for Finding {
    fn from(value: AudioAnalysis) -> Self {
        Self::AudioAnalysis(value)
    }
}

impl From<EcosystemAssessment> for Finding {
    fn from(value: EcosystemAssessment) -> Self {
        Self::EcosystemAssessment(value)
    }
}

impl From<ConservationAction> for Finding {
    fn from(value: ConservationAction) -> Self {
        Self::ConservationAction(value)
    }
}

/// A finding together with the identifier the store assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct StoredFinding {
    pub id: FindingId,
    #[serde(flatten)]
    pub finding: Finding,
}
