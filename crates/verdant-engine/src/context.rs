//! `VerdantContext`: the explicitly constructed handle hosts talk to.
//!
//! Lifecycle is `init → serve requests → shutdown`. The context owns the
//! catalogue, registry, store and orchestrator; nothing lives in globals.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use verdant_catalog::Catalogue;
use verdant_config::VerdantConfig;
use verdant_core::entities::{Finding, MediaRef, StatsSummary, StoredFinding, Subject};
use verdant_core::enums::FindingKind;
use verdant_core::ids::FindingId;
use verdant_core::location::Location;
use verdant_db::{FindingFilter, FindingStore};
use verdant_models::{ModelRegistry, ModelVariant, SelectionPolicy};

use crate::error::EngineError;
use crate::orchestrator::{Orchestrator, PendingFinding, Pipelines, Processed, RequestOptions};
use crate::pipeline::{AudioPipeline, ImagePipeline, TextPipeline};
use crate::recommend::{LocationClassifier, RecommendationEngine};

/// Builder for [`VerdantContext`]. Anything not supplied falls back to the
/// built-in implementation.
pub struct ContextBuilder {
    config: VerdantConfig,
    registry: Option<ModelRegistry>,
    store: Option<Arc<FindingStore>>,
    image: Option<Arc<dyn ImagePipeline>>,
    audio: Option<Arc<dyn AudioPipeline>>,
    text: Option<Arc<dyn TextPipeline>>,
    classifier: Option<Box<dyn LocationClassifier>>,
}

impl ContextBuilder {
    #[must_use]
    pub fn new(config: VerdantConfig) -> Self {
        Self {
            config,
            registry: None,
            store: None,
            image: None,
            audio: None,
            text: None,
            classifier: None,
        }
    }

    /// Replace the default three-variant registry. The configured battery
    /// threshold still applies.
    #[must_use]
    pub fn registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use an already opened store instead of opening `config.store.path`.
    #[must_use]
    pub fn store(mut self, store: Arc<FindingStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn image_pipeline(mut self, pipeline: Arc<dyn ImagePipeline>) -> Self {
        self.image = Some(pipeline);
        self
    }

    #[must_use]
    pub fn audio_pipeline(mut self, pipeline: Arc<dyn AudioPipeline>) -> Self {
        self.audio = Some(pipeline);
        self
    }

    #[must_use]
    pub fn text_pipeline(mut self, pipeline: Arc<dyn TextPipeline>) -> Self {
        self.text = Some(pipeline);
        self
    }

    #[must_use]
    pub fn location_classifier(mut self, classifier: Box<dyn LocationClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Bootstrap the catalogue, open the store and wire the orchestrator.
    ///
    /// # Errors
    ///
    /// `CatalogueBootstrap` for a malformed seed or updates file, `Store` if
    /// the database cannot be opened or the catalogue cannot be mirrored.
    pub async fn build(self) -> Result<VerdantContext, EngineError> {
        let config = self.config;
        config.validate()?;

        let updates = config
            .catalogue
            .has_updates()
            .then(|| Path::new(&config.catalogue.updates_path));
        let catalogue = Arc::new(Catalogue::bootstrap(updates)?);

        let policy = SelectionPolicy {
            low_battery_threshold: config.orchestrator.low_battery_threshold,
        };
        let registry = Arc::new(self.registry.unwrap_or_default().with_policy(policy));

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(FindingStore::open(&config.store).await?),
        };
        let synced = store.sync_catalogue(&catalogue).await?;

        let defaults = Pipelines::simulated(&catalogue);
        let pipelines = Pipelines {
            image: self.image.unwrap_or(defaults.image),
            audio: self.audio.unwrap_or(defaults.audio),
            text: self.text.unwrap_or(defaults.text),
        };
        let recommender = match self.classifier {
            Some(classifier) => {
                RecommendationEngine::new(classifier, config.recommendations.max_actions)
            }
            None => RecommendationEngine::from_config(&config.recommendations),
        };

        tracing::info!(
            store = %config.store.path,
            subjects = synced,
            variants = registry.variants().len(),
            pipelines = ?pipelines,
            "verdant context ready"
        );

        let orchestrator = Orchestrator::new(
            &config.orchestrator,
            Arc::clone(&registry),
            Arc::clone(&catalogue),
            Arc::clone(&store),
            pipelines,
            recommender,
        );
        Ok(VerdantContext {
            config,
            catalogue,
            registry,
            store,
            orchestrator,
        })
    }
}

/// Shared resources for one Verdant host.
pub struct VerdantContext {
    config: VerdantConfig,
    catalogue: Arc<Catalogue>,
    registry: Arc<ModelRegistry>,
    store: Arc<FindingStore>,
    orchestrator: Orchestrator,
}

impl fmt::Debug for VerdantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerdantContext")
            .field("store", &self.config.store.path)
            .field("subjects", &self.catalogue.len())
            .field("variants", &self.registry.variants().len())
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

impl VerdantContext {
    /// Build a context with the built-in pipelines.
    ///
    /// # Errors
    ///
    /// See [`ContextBuilder::build`].
    pub async fn init(config: VerdantConfig) -> Result<Self, EngineError> {
        ContextBuilder::new(config).build().await
    }

    #[must_use]
    pub fn builder(config: VerdantConfig) -> ContextBuilder {
        ContextBuilder::new(config)
    }

    #[must_use]
    pub const fn config(&self) -> &VerdantConfig {
        &self.config
    }

    // -- processing ---------------------------------------------------------

    /// # Errors
    ///
    /// See [`Orchestrator::identify_species`].
    pub async fn process_image(
        &self,
        media: MediaRef,
        location: Option<Location>,
        options: &RequestOptions,
    ) -> Result<Processed, EngineError> {
        self.orchestrator
            .identify_species(media, location, options)
            .await
    }

    /// # Errors
    ///
    /// See [`Orchestrator::analyze_audio`].
    pub async fn process_audio(
        &self,
        media: MediaRef,
        duration_seconds: f64,
        location: Option<Location>,
        options: &RequestOptions,
    ) -> Result<Processed, EngineError> {
        self.orchestrator
            .analyze_audio(media, duration_seconds, location, options)
            .await
    }

    /// # Errors
    ///
    /// See [`Orchestrator::assess_ecosystem`].
    pub async fn process_ecosystem(
        &self,
        image: Option<MediaRef>,
        audio: Option<MediaRef>,
        location: Option<Location>,
        options: &RequestOptions,
    ) -> Result<Processed, EngineError> {
        self.orchestrator
            .assess_ecosystem(image, audio, location, options)
            .await
    }

    /// Write a result kept by a previous `PersistenceFailed`.
    ///
    /// # Errors
    ///
    /// `PersistenceFailed` again if the store still cannot take it.
    pub async fn retry_persist(&self, pending: PendingFinding) -> Result<Processed, EngineError> {
        self.orchestrator.persist(pending).await
    }

    // -- findings -----------------------------------------------------------

    /// Newest-first listing. `limit` of `None` uses `general.default_limit`;
    /// any limit is capped at `general.max_limit`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the query fails.
    pub async fn list_findings(
        &self,
        kind: Option<FindingKind>,
        filter: &FindingFilter,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<StoredFinding>, EngineError> {
        let limit = self.config.general.clamp_limit(limit);
        Ok(self.store.query(kind, filter, limit, offset).await?)
    }

    /// # Errors
    ///
    /// Returns `EngineError::Store` if the lookup fails.
    pub async fn get_finding(&self, id: FindingId) -> Result<Option<Finding>, EngineError> {
        Ok(self.store.get(id).await?)
    }

    /// # Errors
    ///
    /// Returns `EngineError::Store` if aggregation fails.
    pub async fn get_stats(&self) -> Result<StatsSummary, EngineError> {
        Ok(self.store.aggregate_stats().await?)
    }

    /// Mark an action done. Returns the id of the completed successor row.
    ///
    /// # Errors
    ///
    /// `Store(NotFound)` for an unknown action, `Store(ConstraintViolation)`
    /// for a non-action id or an action that is already completed.
    pub async fn complete_action(&self, id: FindingId) -> Result<FindingId, EngineError> {
        Ok(self.store.complete_action(id).await?)
    }

    /// Delete every finding and preference. The catalogue stays.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the delete fails.
    pub async fn erase_all(&self) -> Result<u64, EngineError> {
        Ok(self.store.erase_all().await?)
    }

    // -- preferences --------------------------------------------------------

    /// # Errors
    ///
    /// Returns `EngineError::Store` if the read fails.
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>, EngineError> {
        Ok(self.store.get_preference(key).await?)
    }

    /// Typed read, e.g. `get_preference_as::<bool>("notifications")`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the value does not parse as `T`.
    pub async fn get_preference_as<T>(&self, key: &str) -> Result<Option<T>, EngineError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.store.get_preference_as(key).await?)
    }

    /// # Errors
    ///
    /// Returns `EngineError::Store` for a blank key or a failed write.
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<(), EngineError> {
        Ok(self.store.set_preference(key, value).await?)
    }

    // -- catalogue and registry --------------------------------------------

    #[must_use]
    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.catalogue.get(id)
    }

    #[must_use]
    pub fn search_subjects(&self, text: &str) -> Vec<&Subject> {
        self.catalogue.search(text)
    }

    #[must_use]
    pub fn variants(&self) -> &[ModelVariant] {
        self.registry.variants()
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Release the store. A persistence task detached by a dropped request
    /// holds its own store handle and still commits or rolls back as a unit.
    pub fn shutdown(self) {
        let handles = Arc::strong_count(&self.store);
        tracing::info!(store_handles = handles, "verdant context shutting down");
        drop(self);
    }
}
