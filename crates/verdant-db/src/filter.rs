use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Narrows a finding query.
///
/// The default filter matches every finding that has not been superseded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingFilter {
    /// Only findings that reference this catalogue subject: the discovery's
    /// subject, an audio analysis's detected subjects, or an action's
    /// related subject.
    pub subject_ref: Option<String>,
    /// Only findings created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Also return action rows that a later row supersedes.
    pub include_superseded: bool,
}

impl FindingFilter {
    #[must_use]
    pub fn subject(subject_ref: impl Into<String>) -> Self {
        Self {
            subject_ref: Some(subject_ref.into()),
            ..Self::default()
        }
    }
}
