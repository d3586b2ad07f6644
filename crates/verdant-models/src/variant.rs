use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use verdant_core::enums::Modality;

/// Capacity tier of a model variant. `Compact < Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Compact,
    Full,
}

impl ModelTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered inference model. The registry only describes variants; it
/// never runs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVariant {
    pub id: String,
    pub tier: ModelTier,
    pub supported_modalities: BTreeSet<Modality>,
    /// Approximate relative cost (energy/latency). Only the ordering matters.
    pub relative_cost: u32,
}

impl ModelVariant {
    pub fn new(
        id: impl Into<String>,
        tier: ModelTier,
        modalities: impl IntoIterator<Item = Modality>,
        relative_cost: u32,
    ) -> Self {
        Self {
            id: id.into(),
            tier,
            supported_modalities: modalities.into_iter().collect(),
            relative_cost,
        }
    }

    /// Whether this variant handles every modality in `required`.
    #[must_use]
    pub fn supports_all(&self, required: &BTreeSet<Modality>) -> bool {
        required.is_subset(&self.supported_modalities)
    }

    #[must_use]
    pub fn supports(&self, modality: Modality) -> bool {
        self.supported_modalities.contains(&modality)
    }

    /// Capability ordering key: tier first, then cost.
    #[must_use]
    pub const fn capability(&self) -> (ModelTier, u32) {
        (self.tier, self.relative_cost)
    }
}
