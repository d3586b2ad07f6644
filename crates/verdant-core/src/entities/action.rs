use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::ids::FindingId;
use crate::location::Location;

/// A conservation action derived from a finding.
///
/// Completing an action never edits the row: [`ConservationAction::completed_successor`]
/// builds a new row that supersedes the original.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConservationAction {
    pub action_type: String,
    pub description: String,
    pub related_subject_ref: Option<String>,
    pub impact_score: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub supersedes: Option<FindingId>,
    pub created_at: DateTime<Utc>,
}

impl ConservationAction {
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` if `impact_score < 1` or the
    /// description is blank.
    pub fn new(
        action_type: impl Into<String>,
        description: impl Into<String>,
        related_subject_ref: Option<String>,
        impact_score: i64,
        location: Option<Location>,
    ) -> Result<Self, CoreError> {
        let action = Self {
            action_type: action_type.into(),
            description: description.into(),
            related_subject_ref,
            impact_score,
            completed: false,
            completed_at: None,
            location,
            supersedes: None,
            created_at: Utc::now(),
        };
        action.validate()?;
        Ok(action)
    }

    /// A completed copy of this action that supersedes the row stored as `id`.
    #[must_use]
    pub fn completed_successor(&self, id: FindingId) -> Self {
        let now = Utc::now();
        Self {
            completed: true,
            completed_at: Some(now),
            supersedes: Some(id),
            created_at: now,
            ..self.clone()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        if self.impact_score < 1 {
            return Err(CoreError::constraint(format!(
                "impact score must be at least 1, got {}",
                self.impact_score
            )));
        }
        if self.description.trim().is_empty() {
            return Err(CoreError::constraint("action description must not be blank"));
        }
        if self.completed != self.completed_at.is_some() {
            return Err(CoreError::constraint(
                "completed_at must be set exactly when the action is completed",
            ));
        }
        Ok(())
    }
}
