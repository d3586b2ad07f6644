use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Category, FindingKind};

/// Aggregate counts over the finding store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatsSummary {
    /// All findings across kinds, superseded rows included.
    pub total: u64,
    /// Species discoveries grouped by the subject's catalogue category.
    pub by_category: BTreeMap<Category, u64>,
    pub by_kind: BTreeMap<FindingKind, u64>,
    /// Findings created within the last seven days.
    pub recent_count: u64,
}
