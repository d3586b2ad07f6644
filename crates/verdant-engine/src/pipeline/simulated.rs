//! Deterministic stand-in pipelines.
//!
//! Outputs are derived from a fingerprint of the media handle, so the same
//! capture always yields the same result. A handle that mentions a catalogue
//! id (`captures/bengal-tiger-04.jpg`) is identified as that subject, which
//! keeps demos and tests steerable. Compact variants report slightly lower
//! confidence than full ones.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use verdant_catalog::Catalogue;
use verdant_core::entities::{MediaRef, Subject};
use verdant_core::enums::Category;
use verdant_core::score::Score;
use verdant_models::{ModelTier, ModelVariant};

use super::{
    AudioPipeline, DraftRequest, HabitatSignal, ImageAnalysis, ImagePipeline, PipelineError,
    SoundscapeAnalysis, SubjectCandidate, TextPipeline,
};

const COMPACT_PENALTY: f64 = 0.04;

/// Natural sound events and the catalogue category they hint at.
const NATURAL_SOUNDS: &[(&str, Option<Category>)] = &[
    ("bird_song", Some(Category::Bird)),
    ("insect_buzz", Some(Category::Insect)),
    ("frog_chorus", None),
    ("running_water", None),
    ("leaf_rustle", None),
];

const HUMAN_SOUNDS: &[&str] = &["traffic", "human_voices", "machinery"];

/// FNV-1a over the handle bytes. Stable across runs and platforms.
fn fingerprint(handle: &str) -> u64 {
    handle.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// A value in `[0, 1)` taken from `buckets` slices of the fingerprint.
fn fraction(hash: u64, shift: u32, buckets: u8) -> f64 {
    let bucket = u8::try_from((hash >> shift) % u64::from(buckets)).unwrap_or(0);
    f64::from(bucket) / f64::from(buckets)
}

fn pick(hash: u64, len: usize) -> usize {
    let len = u64::try_from(len).unwrap_or(u64::MAX).max(1);
    usize::try_from(hash % len).unwrap_or(0)
}

fn bit(hash: u64, n: u32) -> bool {
    (hash >> n) & 1 == 1
}

fn tier_penalty(variant: &ModelVariant) -> f64 {
    match variant.tier {
        ModelTier::Compact => COMPACT_PENALTY,
        ModelTier::Full => 0.0,
    }
}

fn unreadable(media: &MediaRef) -> PipelineError {
    PipelineError::UnreadableMedia {
        media: media.as_str().to_string(),
        reason: "empty handle".into(),
    }
}

fn mean(scores: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = scores.fold((0.0, 0_u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / f64::from(count) }
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// Ranks catalogue subjects for an image and estimates habitat indicators.
#[derive(Debug, Clone)]
pub struct SimulatedImagePipeline {
    catalogue: Arc<Catalogue>,
}

impl SimulatedImagePipeline {
    #[must_use]
    pub const fn new(catalogue: Arc<Catalogue>) -> Self {
        Self { catalogue }
    }
}

#[async_trait]
impl ImagePipeline for SimulatedImagePipeline {
    fn name(&self) -> &'static str {
        "simulated-image"
    }

    async fn analyze_image(
        &self,
        variant: &ModelVariant,
        media: &MediaRef,
    ) -> Result<ImageAnalysis, PipelineError> {
        let handle = media.as_str().trim();
        if handle.is_empty() {
            return Err(unreadable(media));
        }
        let subjects: Vec<&Subject> = self.catalogue.iter().collect();
        if subjects.is_empty() {
            return Err(PipelineError::Inference("no subjects to rank against".into()));
        }

        let hash = fingerprint(handle);
        let lowered = handle.to_lowercase();
        let top = subjects
            .iter()
            .position(|s| lowered.contains(&s.id))
            .unwrap_or_else(|| pick(hash, subjects.len()));

        let top_score = 0.72 + 0.24 * fraction(hash, 12, 24) - tier_penalty(variant);
        let mut candidates = vec![SubjectCandidate::new(
            subjects[top].id.clone(),
            Score::saturating(top_score),
        )];
        if subjects.len() > 1 {
            let offset = 1 + pick(hash >> 7, subjects.len() - 1);
            let runner = (top + offset) % subjects.len();
            let gap = 0.02 + 0.2 * fraction(hash, 20, 10);
            candidates.push(SubjectCandidate::new(
                subjects[runner].id.clone(),
                Score::saturating(top_score - gap),
            ));
        }

        let mut indicators = BTreeMap::new();
        let vegetation = 0.3 + 0.6 * fraction(hash, 28, 20);
        indicators.insert("vegetation_cover".to_string(), Score::saturating(vegetation));
        indicators.insert(
            "canopy_density".to_string(),
            Score::saturating(0.2 + 0.7 * fraction(hash, 36, 20)),
        );
        indicators.insert(
            "water_presence".to_string(),
            Score::saturating(fraction(hash, 44, 10)),
        );
        let biodiversity_estimate = Score::saturating(mean(indicators.values().map(|s| s.value())));

        let mut strengths = Vec::new();
        if vegetation >= 0.6 {
            strengths.push("Dense native vegetation".to_string());
        }

        tracing::trace!(media = handle, top = %subjects[top].id, "simulated image analysis");
        Ok(ImageAnalysis {
            candidates,
            habitat: HabitatSignal {
                indicators,
                biodiversity_estimate,
                threats: subjects[top].threats.iter().take(2).cloned().collect(),
                strengths,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

/// Detects a fixed vocabulary of sound events and scores biodiversity from
/// the share of natural ones.
#[derive(Debug, Clone)]
pub struct SimulatedAudioPipeline {
    catalogue: Arc<Catalogue>,
}

impl SimulatedAudioPipeline {
    #[must_use]
    pub const fn new(catalogue: Arc<Catalogue>) -> Self {
        Self { catalogue }
    }

    /// First catalogue subject of `category` picked by `hash`.
    fn subject_in(&self, category: Category, hash: u64) -> Option<String> {
        let matching: Vec<&Subject> = self
            .catalogue
            .iter()
            .filter(|s| s.category == category)
            .collect();
        if matching.is_empty() {
            return None;
        }
        Some(matching[pick(hash, matching.len())].id.clone())
    }
}

#[async_trait]
impl AudioPipeline for SimulatedAudioPipeline {
    fn name(&self) -> &'static str {
        "simulated-audio"
    }

    async fn analyze_audio(
        &self,
        variant: &ModelVariant,
        media: &MediaRef,
    ) -> Result<SoundscapeAnalysis, PipelineError> {
        let handle = media.as_str().trim();
        if handle.is_empty() {
            return Err(unreadable(media));
        }
        let hash = fingerprint(handle);

        let mut detected_sounds = BTreeSet::new();
        let mut detected_subjects = Vec::new();
        let mut natural = 0_u32;
        for (i, (sound, category)) in (0_u32..).zip(NATURAL_SOUNDS) {
            if bit(hash, i) {
                detected_sounds.insert((*sound).to_string());
                natural += 1;
                if let Some(id) = category.and_then(|c| self.subject_in(c, hash >> (8 + i))) {
                    detected_subjects.push(id);
                }
            }
        }
        let mut human = 0_u32;
        for (i, sound) in (16_u32..).zip(HUMAN_SOUNDS) {
            if bit(hash, i) {
                detected_sounds.insert((*sound).to_string());
                human += 1;
            }
        }
        if detected_sounds.is_empty() {
            detected_sounds.insert("wind".to_string());
        }

        let natural_share = f64::from(natural) / 5.0;
        let biodiversity =
            natural_share * 0.9 + 0.1 * fraction(hash, 24, 10) - tier_penalty(variant) / 2.0;
        let biodiversity_score = Score::saturating(biodiversity);

        let mut indicators = BTreeMap::new();
        indicators.insert(
            "bird_activity".to_string(),
            Score::saturating(if detected_sounds.contains("bird_song") { 0.8 } else { 0.1 }),
        );
        indicators.insert(
            "insect_activity".to_string(),
            Score::saturating(if detected_sounds.contains("insect_buzz") { 0.7 } else { 0.1 }),
        );
        indicators.insert(
            "acoustic_quietness".to_string(),
            Score::saturating(1.0 - f64::from(human) / 3.0),
        );

        let mut threats = Vec::new();
        if detected_sounds.contains("traffic") {
            threats.push("Traffic noise".to_string());
        }
        if detected_sounds.contains("machinery") {
            threats.push("Machinery disturbance".to_string());
        }
        let mut strengths = Vec::new();
        if detected_sounds.contains("bird_song") {
            strengths.push("Active bird chorus".to_string());
        }

        Ok(SoundscapeAnalysis {
            detected_sounds,
            biodiversity_score,
            detected_subjects,
            habitat: HabitatSignal {
                indicators,
                biodiversity_estimate: biodiversity_score,
                threats,
                strengths,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Template-based field notes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedTextPipeline;

#[async_trait]
impl TextPipeline for SimulatedTextPipeline {
    fn name(&self) -> &'static str {
        "simulated-text"
    }

    async fn draft(
        &self,
        _variant: &ModelVariant,
        request: &DraftRequest<'_>,
    ) -> Result<String, PipelineError> {
        let subject = request.subject;
        let mut notes = format!(
            "{} ({}) observed",
            subject.common_name, subject.scientific_name
        );
        if let Some(location) = request.location {
            notes.push_str(" near ");
            notes.push_str(&location.resolved_name);
        }
        notes.push_str(&format!(
            ". Status: {}.",
            subject.conservation_status.as_str().replace('_', " ")
        ));
        if let Some(first) = request.actions.first() {
            notes.push_str(" Suggested focus: ");
            notes.push_str(first);
        }
        Ok(notes)
    }
}
