use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::MediaRef;
use crate::errors::CoreError;
use crate::location::Location;
use crate::score::Score;

/// Fused image + audio assessment of a habitat.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EcosystemAssessment {
    pub image_ref: Option<MediaRef>,
    pub audio_ref: Option<MediaRef>,
    pub overall_health: Score,
    pub biodiversity_index: Score,
    pub indicators: BTreeMap<String, Score>,
    pub threats: Vec<String>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
}

impl EcosystemAssessment {
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` when neither media reference is
    /// present or an indicator name is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        image_ref: Option<MediaRef>,
        audio_ref: Option<MediaRef>,
        overall_health: Score,
        biodiversity_index: Score,
        indicators: BTreeMap<String, Score>,
        threats: Vec<String>,
        strengths: Vec<String>,
        location: Option<Location>,
    ) -> Result<Self, CoreError> {
        let assessment = Self {
            image_ref,
            audio_ref,
            overall_health,
            biodiversity_index,
            indicators,
            threats,
            strengths,
            recommendations: Vec::new(),
            location,
            created_at: Utc::now(),
        };
        assessment.validate()?;
        Ok(assessment)
    }

    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        if self.image_ref.is_none() && self.audio_ref.is_none() {
            return Err(CoreError::constraint(
                "ecosystem assessment needs an image or an audio reference",
            ));
        }
        if self.indicators.keys().any(|k| k.trim().is_empty()) {
            return Err(CoreError::constraint("indicator names must not be blank"));
        }
        Ok(())
    }
}
