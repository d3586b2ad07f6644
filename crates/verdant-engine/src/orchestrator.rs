//! The inference orchestrator.
//!
//! Every request walks the same stages:
//!
//! ```text
//! Received → VariantSelected → ModalityProcessing → Fused → Recommended → Persisted → Complete
//!     └──────────────┴──────────────────┴────────────┴──────────┴─────────────┴──→ Failed
//! ```
//!
//! Pipelines run under a per-modality timeout and the caller's
//! `CancellationToken`. Ecosystem requests run the image and audio pipelines
//! concurrently; one of them failing degrades the request to the other.
//! Persistence runs in its own task, so once it starts it commits or rolls
//! back as a unit even if the caller goes away. A store failure hands the
//! computed result back inside [`EngineError::PersistenceFailed`] so it can be
//! retried without running inference again; rows the store rejects as
//! constraint violations are surfaced as such and never kept for retry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use verdant_catalog::Catalogue;
use verdant_config::OrchestratorConfig;
use verdant_core::entities::{
    AudioAnalysis, ConservationAction, EcosystemAssessment, Finding, MediaRef, SpeciesDiscovery,
};
use verdant_core::enums::{AccuracyRequirement, Modality};
use verdant_core::ids::FindingId;
use verdant_core::location::Location;
use verdant_core::score::Score;
use verdant_db::{DatabaseError, FindingStore};
use verdant_models::{DeviceContext, ModelRegistry, ModelVariant, Task, TaskKind};

use crate::confidence::ConfidenceRule;
use crate::error::EngineError;
use crate::fusion::fuse;
use crate::pipeline::{
    AudioPipeline, DraftRequest, HabitatSignal, ImagePipeline, PipelineError,
    SimulatedAudioPipeline, SimulatedImagePipeline, SimulatedTextPipeline, TextPipeline,
};
use crate::recommend::{Action, RecommendationEngine};

// ---------------------------------------------------------------------------
// Stages and tracing
// ---------------------------------------------------------------------------

/// Processing stage of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    VariantSelected,
    ModalityProcessing,
    Fused,
    Recommended,
    Persisted,
    Complete,
    Failed,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::VariantSelected => "variant_selected",
            Self::ModalityProcessing => "modality_processing",
            Self::Fused => "fused",
            Self::Recommended => "recommended",
            Self::Persisted => "persisted",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub at: DateTime<Utc>,
}

/// Stages a request went through, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTrace {
    /// Per-process request counter, for correlating log lines.
    pub request: u64,
    pub task: TaskKind,
    pub stages: Vec<StageRecord>,
    /// Store writes tried for this result; above one after a retried
    /// persistence failure.
    pub persist_attempts: u32,
}

impl StageTrace {
    fn start(request: u64, task: TaskKind) -> Self {
        let mut trace = Self {
            request,
            task,
            stages: Vec::new(),
            persist_attempts: 0,
        };
        trace.enter(Stage::Received);
        trace
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(request = self.request, task = %self.task, %stage, "stage");
        self.stages.push(StageRecord {
            stage,
            at: Utc::now(),
        });
    }

    /// Last stage reached.
    #[must_use]
    pub fn current(&self) -> Stage {
        self.stages.last().map_or(Stage::Received, |r| r.stage)
    }

    /// Record the failure and hand the error back.
    fn fail(&mut self, error: EngineError) -> EngineError {
        let stage = self.current();
        tracing::warn!(
            request = self.request,
            task = %self.task,
            %stage,
            kind = %error.kind(),
            %error,
            "request failed"
        );
        self.stages.push(StageRecord {
            stage: Stage::Failed,
            at: Utc::now(),
        });
        error
    }

    /// Stage names only, handy for assertions and compact output.
    #[must_use]
    pub fn stage_names(&self) -> Vec<Stage> {
        self.stages.iter().map(|r| r.stage).collect()
    }
}

// ---------------------------------------------------------------------------
// Requests and results
// ---------------------------------------------------------------------------

/// Per-request knobs supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub device: DeviceContext,
    pub accuracy: AccuracyRequirement,
    /// Cancelling before `Persisted` aborts the request with nothing written.
    pub cancel: CancellationToken,
}

/// A fully computed result that has not been written yet.
#[derive(Debug, Clone)]
pub struct PendingFinding {
    pub finding: Finding,
    pub actions: Vec<Action>,
    /// Action rows written alongside the finding. Empty when action
    /// persistence is off.
    pub action_findings: Vec<ConservationAction>,
    pub variant: String,
    pub trace: StageTrace,
}

/// A finished, persisted request.
#[derive(Debug, Clone, Serialize)]
pub struct Processed {
    pub id: FindingId,
    pub finding: Finding,
    pub actions: Vec<Action>,
    pub action_ids: Vec<FindingId>,
    pub variant: String,
    pub trace: StageTrace,
}

/// The three pipelines an orchestrator drives.
#[derive(Clone)]
pub struct Pipelines {
    pub image: Arc<dyn ImagePipeline>,
    pub audio: Arc<dyn AudioPipeline>,
    pub text: Arc<dyn TextPipeline>,
}

impl Pipelines {
    /// Deterministic built-in pipelines over `catalogue`.
    #[must_use]
    pub fn simulated(catalogue: &Arc<Catalogue>) -> Self {
        Self {
            image: Arc::new(SimulatedImagePipeline::new(Arc::clone(catalogue))),
            audio: Arc::new(SimulatedAudioPipeline::new(Arc::clone(catalogue))),
            text: Arc::new(SimulatedTextPipeline),
        }
    }
}

impl fmt::Debug for Pipelines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipelines")
            .field("image", &self.image.name())
            .field("audio", &self.audio.name())
            .field("text", &self.text.name())
            .finish()
    }
}

/// Inference output before persistence.
struct Computed {
    finding: Finding,
    actions: Vec<Action>,
    variant: ModelVariant,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    registry: Arc<ModelRegistry>,
    catalogue: Arc<Catalogue>,
    store: Arc<FindingStore>,
    pipelines: Pipelines,
    recommender: RecommendationEngine,
    confidence: ConfidenceRule,
    modality_timeout_ms: u64,
    persist_actions: bool,
    next_request: AtomicU64,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("pipelines", &self.pipelines)
            .field("confidence", &self.confidence)
            .field("modality_timeout_ms", &self.modality_timeout_ms)
            .field("persist_actions", &self.persist_actions)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: &OrchestratorConfig,
        registry: Arc<ModelRegistry>,
        catalogue: Arc<Catalogue>,
        store: Arc<FindingStore>,
        pipelines: Pipelines,
        recommender: RecommendationEngine,
    ) -> Self {
        Self {
            registry,
            catalogue,
            store,
            pipelines,
            recommender,
            confidence: ConfidenceRule {
                separation_margin: config.separation_margin,
                ambiguity_cap: Score::saturating(config.ambiguity_cap),
            },
            modality_timeout_ms: config.modality_timeout_ms,
            persist_actions: config.persist_actions,
            next_request: AtomicU64::new(1),
        }
    }

    fn begin(&self, task: TaskKind) -> StageTrace {
        StageTrace::start(self.next_request.fetch_add(1, Ordering::Relaxed), task)
    }

    /// Identify the subject in an image and record a species discovery.
    ///
    /// # Errors
    ///
    /// See [`EngineError`]; every failure is logged with the stage it
    /// happened in.
    pub async fn identify_species(
        &self,
        media: MediaRef,
        location: Option<Location>,
        options: &RequestOptions,
    ) -> Result<Processed, EngineError> {
        let mut trace = self.begin(TaskKind::IdentifySpecies);
        match self.identify(&mut trace, media, location.as_ref(), options).await {
            Ok(computed) => self.conclude(trace, computed, location, &options.cancel).await,
            Err(e) => Err(trace.fail(e)),
        }
    }

    /// Analyze a soundscape recording.
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` for a non-positive duration, otherwise see
    /// [`EngineError`].
    pub async fn analyze_audio(
        &self,
        media: MediaRef,
        duration_seconds: f64,
        location: Option<Location>,
        options: &RequestOptions,
    ) -> Result<Processed, EngineError> {
        let mut trace = self.begin(TaskKind::AnalyzeAudio);
        match self
            .soundscape(&mut trace, media, duration_seconds, location.as_ref(), options)
            .await
        {
            Ok(computed) => self.conclude(trace, computed, location, &options.cancel).await,
            Err(e) => Err(trace.fail(e)),
        }
    }

    /// Assess an ecosystem from an image, a recording, or both.
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` when neither capture is given;
    /// `InsufficientModalityData` when no modality yields usable indicators.
    pub async fn assess_ecosystem(
        &self,
        image: Option<MediaRef>,
        audio: Option<MediaRef>,
        location: Option<Location>,
        options: &RequestOptions,
    ) -> Result<Processed, EngineError> {
        let mut trace = self.begin(TaskKind::AssessEcosystem);
        match self
            .ecosystem(&mut trace, image, audio, location.as_ref(), options)
            .await
        {
            Ok(computed) => self.conclude(trace, computed, location, &options.cancel).await,
            Err(e) => Err(trace.fail(e)),
        }
    }

    fn select(
        &self,
        trace: &mut StageTrace,
        task: &Task,
        options: &RequestOptions,
    ) -> Result<ModelVariant, EngineError> {
        if options.cancel.is_cancelled() {
            return Err(EngineError::Cancelled {
                stage: Stage::Received,
            });
        }
        let variant = self.registry.select(task, &options.device)?.clone();
        tracing::debug!(
            request = trace.request,
            variant = %variant.id,
            accuracy = %task.accuracy,
            battery = options.device.battery_level.value(),
            plugged_in = options.device.is_plugged_in,
            connectivity = ?options.device.connectivity,
            "variant selected"
        );
        trace.enter(Stage::VariantSelected);
        Ok(variant)
    }

    /// Run one pipeline call under the modality timeout and the caller's token.
    async fn run_modality<T>(
        &self,
        modality: Modality,
        cancel: &CancellationToken,
        work: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, EngineError> {
        let timeout = Duration::from_millis(self.modality_timeout_ms);
        tokio::select! {
            () = cancel.cancelled() => Err(EngineError::Cancelled {
                stage: Stage::ModalityProcessing,
            }),
            outcome = tokio::time::timeout(timeout, work) => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(source)) => Err(EngineError::Pipeline { modality, source }),
                Err(_) => Err(EngineError::ModalityTimeout {
                    modality,
                    timeout_ms: self.modality_timeout_ms,
                }),
            },
        }
    }

    async fn identify(
        &self,
        trace: &mut StageTrace,
        media: MediaRef,
        location: Option<&Location>,
        options: &RequestOptions,
    ) -> Result<Computed, EngineError> {
        let variant = self.select(trace, &Task::identify_species(options.accuracy), options)?;
        trace.enter(Stage::ModalityProcessing);
        let analysis = self
            .run_modality(
                Modality::Image,
                &options.cancel,
                self.pipelines.image.analyze_image(&variant, &media),
            )
            .await?;

        let candidates = analysis
            .candidates
            .into_iter()
            .filter(|c| {
                let known = self.catalogue.contains(&c.subject_ref);
                if !known {
                    tracing::debug!(subject = %c.subject_ref, "dropping unknown candidate");
                }
                known
            })
            .collect();
        let Some((top, confidence)) = self.confidence.resolve(candidates) else {
            return Err(EngineError::InsufficientModalityData(
                "no catalogue subject among the image candidates".into(),
            ));
        };
        let subject = self.catalogue.get(&top.subject_ref).ok_or_else(|| {
            EngineError::InsufficientModalityData(format!("unknown subject '{}'", top.subject_ref))
        })?;
        if confidence != top.score {
            tracing::debug!(
                request = trace.request,
                raw = top.score.value(),
                capped = confidence.value(),
                "ambiguous identification, confidence capped"
            );
        }

        let mut discovery = SpeciesDiscovery::new(subject, confidence, media, location.cloned());
        trace.enter(Stage::Fused);

        let actions =
            self.recommender
                .recommend(&Finding::from(discovery.clone()), Some(subject), location);
        discovery.recommendations = descriptions(&actions);
        if variant.supports(Modality::Text) {
            let request = DraftRequest {
                subject,
                location,
                actions: &discovery.recommendations,
            };
            discovery.notes = self.draft_notes(&variant, &request, &options.cancel).await;
        }
        trace.enter(Stage::Recommended);

        Ok(Computed {
            finding: discovery.into(),
            actions,
            variant,
        })
    }

    /// Text drafts are advisory: any failure just leaves the notes empty.
    async fn draft_notes(
        &self,
        variant: &ModelVariant,
        request: &DraftRequest<'_>,
        cancel: &CancellationToken,
    ) -> Option<String> {
        let drafted = self
            .run_modality(
                Modality::Text,
                cancel,
                self.pipelines.text.draft(variant, request),
            )
            .await;
        match drafted {
            Ok(notes) if !notes.trim().is_empty() => Some(notes.trim().to_string()),
            Ok(_) => None,
            Err(error) => {
                tracing::warn!(%error, "text draft skipped");
                None
            }
        }
    }

    async fn soundscape(
        &self,
        trace: &mut StageTrace,
        media: MediaRef,
        duration_seconds: f64,
        location: Option<&Location>,
        options: &RequestOptions,
    ) -> Result<Computed, EngineError> {
        if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
            return Err(EngineError::ConstraintViolation(format!(
                "duration must be a positive number of seconds, got {duration_seconds}"
            )));
        }
        let variant = self.select(trace, &Task::analyze_audio(options.accuracy), options)?;
        trace.enter(Stage::ModalityProcessing);
        let analysis = self
            .run_modality(
                Modality::Audio,
                &options.cancel,
                self.pipelines.audio.analyze_audio(&variant, &media),
            )
            .await?;

        let mut subjects: Vec<String> = Vec::new();
        for id in analysis.detected_subjects {
            if self.catalogue.contains(&id) && !subjects.contains(&id) {
                subjects.push(id);
            }
        }
        let mut audio = AudioAnalysis::new(
            media,
            duration_seconds,
            analysis.detected_sounds,
            analysis.biodiversity_score,
            subjects,
            location.cloned(),
        )?;
        trace.enter(Stage::Fused);

        let actions =
            self.recommender
                .recommend(&Finding::from(audio.clone()), None, location);
        audio.recommendations = descriptions(&actions);
        trace.enter(Stage::Recommended);

        Ok(Computed {
            finding: audio.into(),
            actions,
            variant,
        })
    }

    async fn ecosystem(
        &self,
        trace: &mut StageTrace,
        image: Option<MediaRef>,
        audio: Option<MediaRef>,
        location: Option<&Location>,
        options: &RequestOptions,
    ) -> Result<Computed, EngineError> {
        if image.is_none() && audio.is_none() {
            return Err(EngineError::ConstraintViolation(
                "ecosystem assessment needs an image or an audio capture".into(),
            ));
        }
        let task = Task::assess_ecosystem(image.is_some(), audio.is_some(), options.accuracy);
        let variant = self.select(trace, &task, options)?;
        trace.enter(Stage::ModalityProcessing);

        let cancel = &options.cancel;
        let image_work = async {
            match &image {
                Some(media) => Some(
                    self.run_modality(
                        Modality::Image,
                        cancel,
                        self.pipelines.image.analyze_image(&variant, media),
                    )
                    .await
                    .map(|a| a.habitat),
                ),
                None => None,
            }
        };
        let audio_work = async {
            match &audio {
                Some(media) => Some(
                    self.run_modality(
                        Modality::Audio,
                        cancel,
                        self.pipelines.audio.analyze_audio(&variant, media),
                    )
                    .await
                    .map(|a| a.habitat),
                ),
                None => None,
            }
        };
        let (image_out, audio_out) = tokio::join!(image_work, audio_work);

        let mut failures = Vec::new();
        let image_signal = settle(trace, Modality::Image, image_out, &mut failures)?;
        let audio_signal = settle(trace, Modality::Audio, audio_out, &mut failures)?;
        if image_signal.is_none() && audio_signal.is_none() {
            let reasons: Vec<String> = failures.iter().map(ToString::to_string).collect();
            return Err(EngineError::InsufficientModalityData(format!(
                "no modality left to fuse: {}",
                reasons.join("; ")
            )));
        }

        let signals: Vec<(Modality, &HabitatSignal)> = [
            image_signal.as_ref().map(|s| (Modality::Image, s)),
            audio_signal.as_ref().map(|s| (Modality::Audio, s)),
        ]
        .into_iter()
        .flatten()
        .collect();
        let fused = fuse(&signals).ok_or_else(|| {
            EngineError::InsufficientModalityData("no habitat indicators in any modality".into())
        })?;
        tracing::debug!(request = trace.request, weights = ?fused.weights, "fused habitat signals");

        let mut assessment = EcosystemAssessment::new(
            image.filter(|_| image_signal.is_some()),
            audio.filter(|_| audio_signal.is_some()),
            fused.overall_health,
            fused.biodiversity_index,
            fused.indicators,
            fused.threats,
            fused.strengths,
            location.cloned(),
        )?;
        trace.enter(Stage::Fused);

        let actions =
            self.recommender
                .recommend(&Finding::from(assessment.clone()), None, location);
        assessment.recommendations = descriptions(&actions);
        trace.enter(Stage::Recommended);

        Ok(Computed {
            finding: assessment.into(),
            actions,
            variant,
        })
    }

    /// Final cancellation check, then persistence.
    async fn conclude(
        &self,
        mut trace: StageTrace,
        computed: Computed,
        location: Option<Location>,
        cancel: &CancellationToken,
    ) -> Result<Processed, EngineError> {
        if cancel.is_cancelled() {
            let stage = trace.current();
            return Err(trace.fail(EngineError::Cancelled { stage }));
        }
        let action_findings = if self.persist_actions {
            match computed
                .actions
                .iter()
                .map(|a| a.to_finding(location.clone()))
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(rows) => rows,
                Err(e) => return Err(trace.fail(e.into())),
            }
        } else {
            Vec::new()
        };

        self.persist(PendingFinding {
            finding: computed.finding,
            actions: computed.actions,
            action_findings,
            variant: computed.variant.id,
            trace,
        })
        .await
    }

    /// Write a computed result. Also the retry path for
    /// [`EngineError::PersistenceFailed`].
    ///
    /// A retry resumes from `Recommended`: the `Failed` record left by the
    /// previous attempt is dropped and `persist_attempts` keeps the count.
    ///
    /// # Errors
    ///
    /// - `Store(ConstraintViolation)` when the store rejects the rows
    ///   themselves. Writing them again would fail the same way, so the
    ///   result is not kept.
    /// - `PersistenceFailed` carrying `pending` back for any other store
    ///   failure.
    pub async fn persist(&self, mut pending: PendingFinding) -> Result<Processed, EngineError> {
        if pending.trace.current() == Stage::Failed {
            pending.trace.stages.pop();
        }
        pending.trace.persist_attempts += 1;

        let store = Arc::clone(&self.store);
        let finding = pending.finding.clone();
        let actions = pending.action_findings.clone();
        let outcome = tokio::spawn(async move { store.save_bundle(&finding, &actions).await }).await;

        let saved = match outcome {
            Ok(Ok(saved)) => saved,
            Ok(Err(source @ DatabaseError::ConstraintViolation(_))) => {
                let mut trace = pending.trace;
                return Err(trace.fail(EngineError::Store(source)));
            }
            Ok(Err(source)) => return Err(persistence_failed(pending, source)),
            Err(join) => {
                let source = DatabaseError::Other(anyhow::anyhow!("persistence task failed: {join}"));
                return Err(persistence_failed(pending, source));
            }
        };

        let PendingFinding {
            finding,
            actions,
            variant,
            mut trace,
            ..
        } = pending;
        trace.enter(Stage::Persisted);
        trace.enter(Stage::Complete);
        tracing::info!(
            request = trace.request,
            id = %saved.primary,
            actions = saved.actions.len(),
            variant = %variant,
            "finding recorded"
        );
        Ok(Processed {
            id: saved.primary,
            finding,
            actions,
            action_ids: saved.actions,
            variant,
            trace,
        })
    }
}

fn persistence_failed(mut pending: PendingFinding, source: DatabaseError) -> EngineError {
    let stage = pending.trace.current();
    tracing::warn!(
        request = pending.trace.request,
        %stage,
        error = %source,
        attempts = pending.trace.persist_attempts,
        "persistence failed, result kept for retry"
    );
    pending.trace.stages.push(StageRecord {
        stage: Stage::Failed,
        at: Utc::now(),
    });
    EngineError::PersistenceFailed {
        pending: Box::new(pending),
        source,
    }
}

/// Sort one ecosystem modality's outcome into a usable signal, a recorded
/// failure, or an immediate abort on cancellation.
fn settle(
    trace: &StageTrace,
    modality: Modality,
    outcome: Option<Result<HabitatSignal, EngineError>>,
    failures: &mut Vec<EngineError>,
) -> Result<Option<HabitatSignal>, EngineError> {
    match outcome {
        None => Ok(None),
        Some(Ok(signal)) => Ok(Some(signal)),
        Some(Err(e @ EngineError::Cancelled { .. })) => Err(e),
        Some(Err(error)) => {
            tracing::warn!(
                request = trace.request,
                %modality,
                %error,
                "modality failed, continuing without it"
            );
            failures.push(error);
            Ok(None)
        }
    }
}

fn descriptions(actions: &[Action]) -> Vec<String> {
    actions.iter().map(|a| a.description.clone()).collect()
}
