//! Request processing through the orchestrator with fake pipelines.

mod support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use verdant_catalog::Catalogue;
use verdant_core::entities::{Finding, MediaRef};
use verdant_core::enums::{AccuracyRequirement, EnvironmentalHealth, FindingKind, Modality};
use verdant_core::score::Score;
use verdant_db::{FindingFilter, FindingStore, VerdantDb};
use verdant_engine::{
    EngineError, ErrorKind, Orchestrator, Pipelines, RecommendationEngine, RequestOptions, Stage,
    VerdantContext,
};
use verdant_models::{DeviceContext, ModelRegistry, ModelTier, ModelVariant};

use support::{FailingText, FixedAudio, FixedImage, StalledAudio, config, habitat, place};

fn high_accuracy() -> RequestOptions {
    RequestOptions {
        accuracy: AccuracyRequirement::High,
        ..RequestOptions::default()
    }
}

#[tokio::test]
async fn urban_park_audio_is_fair_with_urban_actions() {
    let ctx = VerdantContext::builder(config())
        .audio_pipeline(Arc::new(FixedAudio::scoring(0.45)))
        .build()
        .await
        .unwrap();

    let processed = ctx
        .process_audio(
            MediaRef::new("captures/park.wav"),
            45.0,
            Some(place("Urban Park")),
            &RequestOptions::default(),
        )
        .await
        .unwrap();

    let Finding::AudioAnalysis(audio) = &processed.finding else {
        panic!("expected an audio analysis, got {:?}", processed.finding.kind());
    };
    assert_eq!(audio.environmental_health, EnvironmentalHealth::Fair);
    assert!((audio.duration_seconds - 45.0).abs() < f64::EPSILON);
    assert!(processed.actions.iter().any(|a| a.action_type.starts_with("urban_")));
    assert_eq!(
        audio.recommendations,
        processed
            .actions
            .iter()
            .map(|a| a.description.clone())
            .collect::<Vec<_>>()
    );
    assert_eq!(processed.action_ids.len(), processed.actions.len());

    let latest = ctx
        .list_findings(Some(FindingKind::AudioAnalysis), &FindingFilter::default(), Some(1), 0)
        .await
        .unwrap();
    assert_eq!(latest[0].id, processed.id);
}

#[tokio::test]
async fn successful_requests_walk_every_stage() {
    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(FixedImage::new(vec![("neem", 0.93), ("banyan", 0.41)])))
        .build()
        .await
        .unwrap();

    let processed = ctx
        .process_image(MediaRef::new("captures/leaf.jpg"), None, &RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(
        processed.trace.stage_names(),
        vec![
            Stage::Received,
            Stage::VariantSelected,
            Stage::ModalityProcessing,
            Stage::Fused,
            Stage::Recommended,
            Stage::Persisted,
            Stage::Complete,
        ]
    );
    let Finding::SpeciesDiscovery(discovery) = &processed.finding else {
        panic!("expected a discovery");
    };
    assert_eq!(discovery.subject_ref, "neem");
    assert_eq!(discovery.confidence, Score::new(0.93).unwrap());
}

#[tokio::test]
async fn close_candidates_cap_confidence() {
    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(FixedImage::new(vec![("banyan", 0.89), ("peepal", 0.91)])))
        .build()
        .await
        .unwrap();

    let processed = ctx
        .process_image(MediaRef::new("captures/fig.jpg"), None, &RequestOptions::default())
        .await
        .unwrap();
    let Finding::SpeciesDiscovery(discovery) = processed.finding else {
        panic!("expected a discovery");
    };
    assert_eq!(discovery.subject_ref, "peepal");
    assert_eq!(discovery.confidence, Score::new(0.6).unwrap());
}

#[tokio::test]
async fn unknown_candidates_are_dropped_before_ranking() {
    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(FixedImage::new(vec![
            ("snow-leopard", 0.99),
            ("neem", 0.80),
        ])))
        .build()
        .await
        .unwrap();
    let processed = ctx
        .process_image(MediaRef::new("captures/a.jpg"), None, &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(processed.finding.subject_refs(), vec!["neem"]);

    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(FixedImage::new(vec![("snow-leopard", 0.99)])))
        .build()
        .await
        .unwrap();
    let err = ctx
        .process_image(MediaRef::new("captures/b.jpg"), None, &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientModalityData);
    assert_eq!(ctx.get_stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn stalled_audio_degrades_ecosystem_to_image() {
    let image = FixedImage::new(vec![("neem", 0.9)]);
    let image_indicators = image.habitat.indicators.clone();
    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(image))
        .audio_pipeline(Arc::new(StalledAudio))
        .build()
        .await
        .unwrap();

    let processed = ctx
        .process_ecosystem(
            Some(MediaRef::new("captures/grove.jpg")),
            Some(MediaRef::new("captures/grove.wav")),
            None,
            &RequestOptions::default(),
        )
        .await
        .unwrap();

    let Finding::EcosystemAssessment(eco) = &processed.finding else {
        panic!("expected an ecosystem assessment");
    };
    assert_eq!(eco.image_ref, Some(MediaRef::new("captures/grove.jpg")));
    assert_eq!(eco.audio_ref, None);
    assert_eq!(eco.indicators, image_indicators);
    assert!((eco.overall_health.value() - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn stalled_audio_alone_is_a_timeout() {
    let ctx = VerdantContext::builder(config())
        .audio_pipeline(Arc::new(StalledAudio))
        .build()
        .await
        .unwrap();

    let err = ctx
        .process_audio(MediaRef::new("captures/x.wav"), 10.0, None, &RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ModalityTimeout {
            modality: Modality::Audio,
            timeout_ms: 200
        }
    ));
}

#[tokio::test]
async fn ecosystem_with_only_a_stalled_recording_has_nothing_to_fuse() {
    let ctx = VerdantContext::builder(config())
        .audio_pipeline(Arc::new(StalledAudio))
        .build()
        .await
        .unwrap();

    let err = ctx
        .process_ecosystem(
            None,
            Some(MediaRef::new("captures/a.wav")),
            None,
            &RequestOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientModalityData);
    assert!(err.to_string().contains("timed out after 200 ms"), "{err}");
    assert_eq!(ctx.get_stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn ecosystem_fuses_both_modalities() {
    let mut image = FixedImage::new(vec![("neem", 0.9)]);
    image.habitat = habitat(&[("vegetation_cover", 0.8), ("bird_activity", 0.2)], 0.4);
    image.habitat.threats = vec!["Habitat loss".into()];
    let mut audio = FixedAudio::scoring(0.8);
    audio.habitat.threats = vec!["habitat loss".into(), "Traffic noise".into()];

    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(image))
        .audio_pipeline(Arc::new(audio))
        .build()
        .await
        .unwrap();

    let processed = ctx
        .process_ecosystem(
            Some(MediaRef::new("captures/w.jpg")),
            Some(MediaRef::new("captures/w.wav")),
            Some(place("Western Ghats Reserve")),
            &RequestOptions::default(),
        )
        .await
        .unwrap();
    let Finding::EcosystemAssessment(eco) = &processed.finding else {
        panic!("expected an ecosystem assessment");
    };
    assert!((eco.indicators["bird_activity"].value() - 0.35).abs() < 1e-9);
    assert!((eco.biodiversity_index.value() - 0.6).abs() < 1e-9);
    assert_eq!(eco.threats, vec!["Habitat loss", "Traffic noise"]);
    assert!(processed.actions.iter().any(|a| a.action_type == "threat_mitigation"));
    assert!(processed.actions.iter().any(|a| a.action_type == "forest_protection"));
}

#[tokio::test]
async fn invalid_requests_fail_before_inference() {
    let ctx = VerdantContext::init(config()).await.unwrap();
    let opts = RequestOptions::default();

    let err = ctx
        .process_audio(MediaRef::new("captures/x.wav"), 0.0, None, &opts)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    let err = ctx
        .process_ecosystem(None, None, None, &opts)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
}

#[tokio::test]
async fn missing_modality_support_is_no_capable_variant() {
    let registry = ModelRegistry::new(vec![ModelVariant::new(
        "vision-only",
        ModelTier::Compact,
        [Modality::Image],
        1,
    )])
    .unwrap();
    let ctx = VerdantContext::builder(config())
        .registry(registry)
        .build()
        .await
        .unwrap();

    let err = ctx
        .process_audio(MediaRef::new("captures/x.wav"), 5.0, None, &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoCapableVariant);
}

#[tokio::test]
async fn failed_text_draft_leaves_notes_empty() {
    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(FixedImage::new(vec![("tulsi", 0.88)])))
        .text_pipeline(Arc::new(FailingText))
        .build()
        .await
        .unwrap();

    let processed = ctx
        .process_image(MediaRef::new("captures/herb.jpg"), None, &high_accuracy())
        .await
        .unwrap();
    assert_eq!(processed.variant, "full-multimodal");
    let Finding::SpeciesDiscovery(discovery) = processed.finding else {
        panic!("expected a discovery");
    };
    assert_eq!(discovery.notes, None);
}

#[tokio::test]
async fn text_capable_variants_write_notes() {
    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(FixedImage::new(vec![("tulsi", 0.88)])))
        .build()
        .await
        .unwrap();

    let processed = ctx
        .process_image(
            MediaRef::new("captures/herb.jpg"),
            Some(place("Bengaluru Campus")),
            &high_accuracy(),
        )
        .await
        .unwrap();
    let Finding::SpeciesDiscovery(discovery) = processed.finding else {
        panic!("expected a discovery");
    };
    let notes = discovery.notes.unwrap();
    assert!(notes.contains("Holy Basil"));
    assert!(notes.contains("Bengaluru Campus"));
}

#[tokio::test]
async fn low_battery_picks_the_cheapest_variant() {
    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(FixedImage::new(vec![("neem", 0.9)])))
        .build()
        .await
        .unwrap();
    let options = RequestOptions {
        device: DeviceContext {
            battery_level: Score::new(0.1).unwrap(),
            ..DeviceContext::default()
        },
        ..RequestOptions::default()
    };

    let processed = ctx
        .process_image(MediaRef::new("captures/n.jpg"), None, &options)
        .await
        .unwrap();
    assert_eq!(processed.variant, "compact-lite");
}

#[tokio::test]
async fn cancellation_before_persist_writes_nothing() {
    let token = CancellationToken::new();
    let mut image = FixedImage::new(vec![("neem", 0.9)]);
    image.cancel_on_call = Some(token.clone());
    let ctx = VerdantContext::builder(config())
        .image_pipeline(Arc::new(image))
        .build()
        .await
        .unwrap();

    let options = RequestOptions {
        cancel: token,
        ..RequestOptions::default()
    };
    let err = ctx
        .process_image(MediaRef::new("captures/n.jpg"), None, &options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(ctx.get_stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn already_cancelled_requests_stop_at_received() {
    let ctx = VerdantContext::init(config()).await.unwrap();
    let options = RequestOptions::default();
    options.cancel.cancel();

    let err = ctx
        .process_audio(MediaRef::new("captures/x.wav"), 3.0, None, &options)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Cancelled {
            stage: Stage::Received
        }
    ));
}

#[tokio::test]
async fn rejected_rows_are_a_constraint_violation_not_a_retry() {
    let catalogue = Arc::new(Catalogue::bootstrap(None).unwrap());
    // The store has not mirrored the catalogue, so the subject reference dangles.
    let store = Arc::new(FindingStore::in_memory().await.unwrap());
    let orchestrator = Orchestrator::new(
        &config().orchestrator,
        Arc::new(ModelRegistry::default()),
        Arc::clone(&catalogue),
        Arc::clone(&store),
        Pipelines {
            image: Arc::new(FixedImage::new(vec![("asian-elephant", 0.95)])),
            ..Pipelines::simulated(&catalogue)
        },
        RecommendationEngine::default(),
    );

    let err = orchestrator
        .identify_species(MediaRef::new("captures/e.jpg"), None, &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert!(err.into_pending().is_none());
    assert_eq!(store.aggregate_stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn persistence_failure_keeps_result_for_retry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("verdant.db").display().to_string();
    let mut cfg = config();
    cfg.store.path.clone_from(&path);
    let ctx = VerdantContext::builder(cfg)
        .image_pipeline(Arc::new(FixedImage::new(vec![("asian-elephant", 0.95)])))
        .build()
        .await
        .unwrap();

    // A second connection parks the discoveries table so the write fails
    // for a reason unrelated to the rows themselves.
    let side = VerdantDb::open_local(&path).await.unwrap();
    side.conn()
        .execute("ALTER TABLE species_discoveries RENAME TO parked_discoveries", ())
        .await
        .unwrap();

    let err = ctx
        .process_image(MediaRef::new("captures/e.jpg"), None, &RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceFailed);
    let pending = err.into_pending().unwrap();
    assert_eq!(pending.finding.subject_refs(), vec!["asian-elephant"]);
    assert_eq!(pending.trace.current(), Stage::Failed);
    assert_eq!(pending.trace.persist_attempts, 1);
    assert_eq!(ctx.get_stats().await.unwrap().total, 0);

    side.conn()
        .execute("ALTER TABLE parked_discoveries RENAME TO species_discoveries", ())
        .await
        .unwrap();
    let processed = ctx.retry_persist(pending.clone()).await.unwrap();
    assert_eq!(processed.finding, pending.finding);
    assert_eq!(
        processed.trace.stage_names(),
        vec![
            Stage::Received,
            Stage::VariantSelected,
            Stage::ModalityProcessing,
            Stage::Fused,
            Stage::Recommended,
            Stage::Persisted,
            Stage::Complete,
        ]
    );
    assert_eq!(processed.trace.persist_attempts, 2);
    assert_eq!(ctx.get_finding(processed.id).await.unwrap(), Some(pending.finding));
}

#[tokio::test]
async fn action_rows_can_be_switched_off() {
    let mut cfg = config();
    cfg.orchestrator.persist_actions = false;
    let ctx = VerdantContext::builder(cfg)
        .image_pipeline(Arc::new(FixedImage::new(vec![("bengal-tiger", 0.9)])))
        .build()
        .await
        .unwrap();

    let processed = ctx
        .process_image(MediaRef::new("captures/t.jpg"), None, &RequestOptions::default())
        .await
        .unwrap();
    assert!(!processed.actions.is_empty());
    assert!(processed.action_ids.is_empty());
    assert_eq!(ctx.get_stats().await.unwrap().total, 1);
}
