//! Hand-written pipeline fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use verdant_config::VerdantConfig;
use verdant_core::entities::MediaRef;
use verdant_core::location::Location;
use verdant_core::score::Score;
use verdant_db::IN_MEMORY;
use verdant_engine::pipeline::{
    AudioPipeline, DraftRequest, HabitatSignal, ImageAnalysis, ImagePipeline, PipelineError,
    SoundscapeAnalysis, SubjectCandidate, TextPipeline,
};
use verdant_models::ModelVariant;

pub fn config() -> VerdantConfig {
    let mut config = VerdantConfig::default();
    config.store.path = IN_MEMORY.to_string();
    config.orchestrator.modality_timeout_ms = 200;
    config
}

pub fn place(name: &str) -> Location {
    Location::new(12.97, 77.59, name).unwrap()
}

pub fn habitat(indicators: &[(&str, f64)], biodiversity: f64) -> HabitatSignal {
    HabitatSignal {
        indicators: indicators
            .iter()
            .map(|(k, v)| ((*k).to_string(), Score::new(*v).unwrap()))
            .collect::<BTreeMap<_, _>>(),
        biodiversity_estimate: Score::new(biodiversity).unwrap(),
        threats: Vec::new(),
        strengths: Vec::new(),
    }
}

/// Returns the same candidates and habitat for every image.
pub struct FixedImage {
    pub candidates: Vec<(&'static str, f64)>,
    pub habitat: HabitatSignal,
    /// Cancelled as soon as the pipeline is invoked.
    pub cancel_on_call: Option<CancellationToken>,
}

impl FixedImage {
    pub fn new(candidates: Vec<(&'static str, f64)>) -> Self {
        Self {
            candidates,
            habitat: habitat(&[("vegetation_cover", 0.7), ("water_presence", 0.3)], 0.6),
            cancel_on_call: None,
        }
    }
}

#[async_trait]
impl ImagePipeline for FixedImage {
    fn name(&self) -> &'static str {
        "fixed-image"
    }

    async fn analyze_image(
        &self,
        _variant: &ModelVariant,
        _media: &MediaRef,
    ) -> Result<ImageAnalysis, PipelineError> {
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        Ok(ImageAnalysis {
            candidates: self
                .candidates
                .iter()
                .map(|(id, s)| SubjectCandidate::new(*id, Score::new(*s).unwrap()))
                .collect(),
            habitat: self.habitat.clone(),
        })
    }
}

/// Returns a fixed soundscape for every recording.
pub struct FixedAudio {
    pub biodiversity: f64,
    pub subjects: Vec<String>,
    pub habitat: HabitatSignal,
}

impl FixedAudio {
    pub fn scoring(biodiversity: f64) -> Self {
        Self {
            biodiversity,
            subjects: Vec::new(),
            habitat: habitat(&[("bird_activity", 0.5)], biodiversity),
        }
    }
}

#[async_trait]
impl AudioPipeline for FixedAudio {
    fn name(&self) -> &'static str {
        "fixed-audio"
    }

    async fn analyze_audio(
        &self,
        _variant: &ModelVariant,
        _media: &MediaRef,
    ) -> Result<SoundscapeAnalysis, PipelineError> {
        Ok(SoundscapeAnalysis {
            detected_sounds: BTreeSet::from(["bird_song".to_string(), "traffic".to_string()]),
            biodiversity_score: Score::new(self.biodiversity).unwrap(),
            detected_subjects: self.subjects.clone(),
            habitat: self.habitat.clone(),
        })
    }
}

/// Never answers within any sane timeout.
pub struct StalledAudio;

#[async_trait]
impl AudioPipeline for StalledAudio {
    fn name(&self) -> &'static str {
        "stalled-audio"
    }

    async fn analyze_audio(
        &self,
        _variant: &ModelVariant,
        _media: &MediaRef,
    ) -> Result<SoundscapeAnalysis, PipelineError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(PipelineError::Inference("unreachable".into()))
    }
}

pub struct FailingText;

#[async_trait]
impl TextPipeline for FailingText {
    fn name(&self) -> &'static str {
        "failing-text"
    }

    async fn draft(
        &self,
        _variant: &ModelVariant,
        _request: &DraftRequest<'_>,
    ) -> Result<String, PipelineError> {
        Err(PipelineError::Inference("text model unavailable".into()))
    }
}
