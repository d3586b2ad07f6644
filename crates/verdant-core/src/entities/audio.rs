use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::MediaRef;
use crate::enums::EnvironmentalHealth;
use crate::errors::CoreError;
use crate::location::Location;
use crate::score::Score;

/// Result of analysing a soundscape recording.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AudioAnalysis {
    pub media_ref: MediaRef,
    pub duration_seconds: f64,
    pub detected_sounds: BTreeSet<String>,
    pub biodiversity_score: Score,
    pub environmental_health: EnvironmentalHealth,
    pub detected_subjects: Vec<String>,
    pub recommendations: Vec<String>,
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
}

impl AudioAnalysis {
    /// Build an analysis. Environmental health is derived from the score.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` if `duration_seconds` is not a
    /// positive finite number.
    pub fn new(
        media_ref: MediaRef,
        duration_seconds: f64,
        detected_sounds: BTreeSet<String>,
        biodiversity_score: Score,
        detected_subjects: Vec<String>,
        location: Option<Location>,
    ) -> Result<Self, CoreError> {
        check_duration(duration_seconds)?;
        Ok(Self {
            media_ref,
            duration_seconds,
            detected_sounds,
            biodiversity_score,
            environmental_health: EnvironmentalHealth::from_biodiversity(biodiversity_score),
            detected_subjects,
            recommendations: Vec::new(),
            location,
            created_at: Utc::now(),
        })
    }
}

pub(crate) fn check_duration(duration_seconds: f64) -> Result<(), CoreError> {
    if duration_seconds.is_finite() && duration_seconds > 0.0 {
        Ok(())
    } else {
        Err(CoreError::constraint(format!(
            "audio duration must be positive, got {duration_seconds}"
        )))
    }
}
