//! Per-modality inference pipelines.
//!
//! The orchestrator only talks to these traits. Each call receives the model
//! variant chosen by the registry, so an implementation can trade accuracy for
//! cost the same way a real on-device model would. The [`simulated`] module
//! provides deterministic implementations used by the CLI and by tests that do
//! not need a hand-written fake.

pub mod simulated;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use verdant_core::entities::{MediaRef, Subject};
use verdant_core::location::Location;
use verdant_core::score::Score;
use verdant_models::ModelVariant;

pub use simulated::{SimulatedAudioPipeline, SimulatedImagePipeline, SimulatedTextPipeline};

/// Errors raised by a pipeline implementation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The media handle could not be read or decoded.
    #[error("unreadable media '{media}': {reason}")]
    UnreadableMedia { media: String, reason: String },

    /// The model ran but produced nothing usable.
    #[error("inference failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One ranked guess at which catalogue subject a capture shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectCandidate {
    pub subject_ref: String,
    pub score: Score,
}

impl SubjectCandidate {
    #[must_use]
    pub fn new(subject_ref: impl Into<String>, score: Score) -> Self {
        Self {
            subject_ref: subject_ref.into(),
            score,
        }
    }
}

/// Habitat evidence extracted from one modality, consumed by ecosystem fusion.
///
/// Indicator names are free-form; two modalities reporting the same name are
/// averaged together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitatSignal {
    pub indicators: BTreeMap<String, Score>,
    pub biodiversity_estimate: Score,
    pub threats: Vec<String>,
    pub strengths: Vec<String>,
}

impl HabitatSignal {
    /// A modality with no indicators, or only zero-valued ones, carries no signal.
    #[must_use]
    pub fn has_signal(&self) -> bool {
        self.indicators.values().any(|score| score.value() > 0.0)
    }
}

/// Output of an [`ImagePipeline`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    /// Candidates in any order; the orchestrator ranks them.
    pub candidates: Vec<SubjectCandidate>,
    pub habitat: HabitatSignal,
}

/// Output of an [`AudioPipeline`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundscapeAnalysis {
    pub detected_sounds: BTreeSet<String>,
    pub biodiversity_score: Score,
    /// Catalogue ids heard in the recording.
    pub detected_subjects: Vec<String>,
    pub habitat: HabitatSignal,
}

/// What the text pipeline is asked to write about.
#[derive(Debug, Clone)]
pub struct DraftRequest<'a> {
    pub subject: &'a Subject,
    pub location: Option<&'a Location>,
    /// Action descriptions already chosen, highest impact first.
    pub actions: &'a [String],
}

/// Identifies subjects and habitat features in a still image.
#[async_trait]
pub trait ImagePipeline: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;

    /// Analyze the image behind `media` with `variant`.
    async fn analyze_image(
        &self,
        variant: &ModelVariant,
        media: &MediaRef,
    ) -> Result<ImageAnalysis, PipelineError>;
}

/// Detects sound events and scores acoustic biodiversity.
#[async_trait]
pub trait AudioPipeline: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze_audio(
        &self,
        variant: &ModelVariant,
        media: &MediaRef,
    ) -> Result<SoundscapeAnalysis, PipelineError>;
}

/// Writes free-form field notes for a discovery.
#[async_trait]
pub trait TextPipeline: Send + Sync {
    fn name(&self) -> &'static str;

    async fn draft(
        &self,
        variant: &ModelVariant,
        request: &DraftRequest<'_>,
    ) -> Result<String, PipelineError>;
}
