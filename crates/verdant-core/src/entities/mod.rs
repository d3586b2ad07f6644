//! Entity structs for all Verdant domain objects.
//!
//! Each finding kind maps to its own table in the libSQL store. All structs
//! derive `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip and
//! schema export.

mod action;
mod audio;
mod discovery;
mod ecosystem;
mod finding;
mod media;
mod stats;
mod subject;

pub use action::ConservationAction;
pub use audio::AudioAnalysis;
pub use discovery::SpeciesDiscovery;
pub use ecosystem::EcosystemAssessment;
pub use finding::{Finding, StoredFinding};
pub use media::MediaRef;
pub use stats::StatsSummary;
pub use subject::Subject;
