//! # verdant-engine
//!
//! Turns captures into recorded findings. The [`orchestrator`] selects a model
//! variant, runs the per-modality [`pipeline`]s, [`fusion`] combines ecosystem
//! signals, [`recommend`] ranks conservation actions, and the result is
//! written to the finding store. [`VerdantContext`] wires all of it together
//! for a host.

pub mod confidence;
pub mod context;
pub mod error;
pub mod fusion;
pub mod orchestrator;
pub mod pipeline;
pub mod recommend;

pub use context::{ContextBuilder, VerdantContext};
pub use error::{EngineError, ErrorKind};
pub use orchestrator::{
    Orchestrator, PendingFinding, Pipelines, Processed, RequestOptions, Stage, StageTrace,
};
pub use pipeline::PipelineError;
pub use recommend::{Action, KeywordClassifier, LocationClassifier, LocationContext, RecommendationEngine};
