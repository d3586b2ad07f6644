use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{MediaRef, Subject};
use crate::enums::ConservationStatus;
use crate::location::Location;
use crate::score::Score;

/// A species identified from a captured image.
///
/// Conservation status and threats are copied from the catalogue at creation
/// time so later catalogue updates do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SpeciesDiscovery {
    pub subject_ref: String,
    pub confidence: Score,
    pub media_ref: MediaRef,
    pub location: Option<Location>,
    pub conservation_status_snapshot: ConservationStatus,
    pub threats_snapshot: Vec<String>,
    pub recommendations: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SpeciesDiscovery {
    /// Build a discovery for `subject`, snapshotting its catalogue metadata.
    #[must_use]
    pub fn new(
        subject: &Subject,
        confidence: Score,
        media_ref: MediaRef,
        location: Option<Location>,
    ) -> Self {
        Self {
            subject_ref: subject.id.clone(),
            confidence,
            media_ref,
            location,
            conservation_status_snapshot: subject.conservation_status,
            threats_snapshot: subject.threats.clone(),
            recommendations: Vec::new(),
            notes: None,
            created_at: Utc::now(),
        }
    }
}
