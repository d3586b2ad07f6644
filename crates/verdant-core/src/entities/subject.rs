use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Category, ConservationStatus};

/// A catalogued species with its conservation metadata.
///
/// Loaded once at startup. Findings snapshot the fields they need and never
/// write back.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    pub common_name: String,
    pub scientific_name: String,
    pub category: Category,
    pub description: String,
    pub conservation_status: ConservationStatus,
    pub habitat: String,
    #[serde(default)]
    pub threats: Vec<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}
