//! # verdant-models
//!
//! Describes the inference model variants available on the device and picks
//! one per request. Nothing here runs a model: pipelines live in
//! `verdant-engine` and receive the chosen [`ModelVariant`].

mod error;
mod registry;
mod task;
mod variant;

pub use error::RegistryError;
pub use registry::{ModelRegistry, SelectionPolicy};
pub use task::{DeviceContext, Task, TaskKind};
pub use variant::{ModelTier, ModelVariant};
