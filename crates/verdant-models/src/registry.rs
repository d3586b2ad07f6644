//! The model registry and its selection policy.
//!
//! Selection is a pure function of the registry, the task, and the device
//! context. Among the variants that support every modality the task needs:
//!
//! 1. battery below the low-battery threshold and accuracy not `high`:
//!    the cheapest variant;
//! 2. accuracy `high`, or the device is plugged in: the most capable variant;
//! 3. otherwise the cheapest mid-cost variant (strictly between the cheapest
//!    and the most expensive), falling back to the most capable `full`
//!    variant, then to the most capable variant overall.
//!
//! Ties always go to the variant registered first.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use verdant_core::enums::{AccuracyRequirement, Modality};

use crate::error::RegistryError;
use crate::task::{DeviceContext, Task};
use crate::variant::{ModelTier, ModelVariant};

/// Knobs for [`ModelRegistry::select`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    /// Battery fraction below which the cheapest variant wins unless high
    /// accuracy is required.
    pub low_battery_threshold: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            low_battery_threshold: 0.2,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    variants: Vec<ModelVariant>,
}

/// Immutable list of model variants, in registration order.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    variants: Vec<ModelVariant>,
    policy: SelectionPolicy,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            variants: default_variants(),
            policy: SelectionPolicy::default(),
        }
    }
}

fn default_variants() -> Vec<ModelVariant> {
    vec![
        ModelVariant::new(
            "compact-lite",
            ModelTier::Compact,
            [Modality::Image, Modality::Audio],
            1,
        ),
        ModelVariant::new(
            "balanced",
            ModelTier::Compact,
            [Modality::Image, Modality::Audio, Modality::Text],
            3,
        ),
        ModelVariant::new(
            "full-multimodal",
            ModelTier::Full,
            [Modality::Image, Modality::Audio, Modality::Text],
            8,
        ),
    ]
}

impl ModelRegistry {
    /// # Errors
    ///
    /// Returns `RegistryError::Malformed` for an empty list, duplicate ids, or
    /// a variant with no modalities.
    pub fn new(variants: Vec<ModelVariant>) -> Result<Self, RegistryError> {
        if variants.is_empty() {
            return Err(RegistryError::Malformed("registry has no variants".into()));
        }
        let mut seen = HashSet::new();
        for variant in &variants {
            if variant.id.trim().is_empty() {
                return Err(RegistryError::Malformed("variant id must not be blank".into()));
            }
            if !seen.insert(variant.id.as_str()) {
                return Err(RegistryError::Malformed(format!(
                    "duplicate variant id '{}'",
                    variant.id
                )));
            }
            if variant.supported_modalities.is_empty() {
                return Err(RegistryError::Malformed(format!(
                    "variant '{}' supports no modality",
                    variant.id
                )));
            }
        }
        Ok(Self {
            variants,
            policy: SelectionPolicy::default(),
        })
    }

    /// Parse a registry from TOML (`[[variants]]` tables).
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Malformed` if the document does not parse or
    /// fails [`ModelRegistry::new`]'s checks.
    pub fn from_toml_str(text: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile =
            toml::from_str(text).map_err(|e| RegistryError::Malformed(e.to_string()))?;
        Self::new(file.variants)
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn variants(&self) -> &[ModelVariant] {
        &self.variants
    }

    #[must_use]
    pub const fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Pick the variant for `task` under `device`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NoCapableVariant` when no variant supports the
    /// task's modality set.
    pub fn select(&self, task: &Task, device: &DeviceContext) -> Result<&ModelVariant, RegistryError> {
        let capable: Vec<&ModelVariant> = self
            .variants
            .iter()
            .filter(|v| v.supports_all(&task.modalities))
            .collect();
        if capable.is_empty() {
            return Err(RegistryError::NoCapableVariant {
                required: describe(&task.modalities),
            });
        }

        let high_accuracy = task.accuracy == AccuracyRequirement::High;
        let low_battery = device.battery_level.value() < self.policy.low_battery_threshold;

        let chosen = if low_battery && !high_accuracy {
            cheapest(capable.iter().copied())
        } else if high_accuracy || device.is_plugged_in {
            most_capable(capable.iter().copied())
        } else {
            mid_cost(&capable)
                .or_else(|| most_capable(capable.iter().copied().filter(|v| v.tier == ModelTier::Full)))
                .or_else(|| most_capable(capable.iter().copied()))
        };

        chosen.ok_or_else(|| RegistryError::NoCapableVariant {
            required: describe(&task.modalities),
        })
    }
}

fn describe(modalities: &BTreeSet<Modality>) -> String {
    modalities
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lowest cost; first registered wins ties.
fn cheapest<'a>(variants: impl Iterator<Item = &'a ModelVariant>) -> Option<&'a ModelVariant> {
    variants.fold(None, |best, v| match best {
        Some(b) if b.relative_cost <= v.relative_cost => Some(b),
        _ => Some(v),
    })
}

/// Highest `(tier, cost)`; first registered wins ties.
fn most_capable<'a>(variants: impl Iterator<Item = &'a ModelVariant>) -> Option<&'a ModelVariant> {
    variants.fold(None, |best, v| match best {
        Some(b) if b.capability() >= v.capability() => Some(b),
        _ => Some(v),
    })
}

/// Cheapest variant whose cost is strictly between the cheapest and the most
/// expensive capable variant.
fn mid_cost<'a>(capable: &[&'a ModelVariant]) -> Option<&'a ModelVariant> {
    let min = capable.iter().map(|v| v.relative_cost).min()?;
    let max = capable.iter().map(|v| v.relative_cost).max()?;
    cheapest(
        capable
            .iter()
            .copied()
            .filter(|v| v.relative_cost > min && v.relative_cost < max),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use verdant_core::score::Score;

    use super::*;

    fn device(battery: f64, plugged: bool) -> DeviceContext {
        DeviceContext {
            battery_level: Score::new(battery).unwrap(),
            is_plugged_in: plugged,
            ..DeviceContext::default()
        }
    }

    #[rstest]
    #[case::low_battery_standard(0.1, false, AccuracyRequirement::Standard, "compact-lite")]
    #[case::low_battery_plugged_still_cheap(0.1, true, AccuracyRequirement::Low, "compact-lite")]
    #[case::low_battery_high_accuracy(0.1, false, AccuracyRequirement::High, "full-multimodal")]
    #[case::plugged_in(0.9, true, AccuracyRequirement::Standard, "full-multimodal")]
    #[case::high_accuracy(0.9, false, AccuracyRequirement::High, "full-multimodal")]
    #[case::mid_cost(0.9, false, AccuracyRequirement::Standard, "balanced")]
    #[case::threshold_is_exclusive(0.2, false, AccuracyRequirement::Low, "balanced")]
    fn default_registry_policy(
        #[case] battery: f64,
        #[case] plugged: bool,
        #[case] accuracy: AccuracyRequirement,
        #[case] expected: &str,
    ) {
        let registry = ModelRegistry::default();
        let task = Task::assess_ecosystem(true, true, accuracy);
        let chosen = registry.select(&task, &device(battery, plugged)).unwrap();
        assert_eq!(chosen.id, expected);
    }

    #[test]
    fn no_capable_variant() {
        let registry = ModelRegistry::new(vec![ModelVariant::new(
            "vision-only",
            ModelTier::Compact,
            [Modality::Image],
            1,
        )])
        .unwrap();
        let err = registry
            .select(
                &Task::analyze_audio(AccuracyRequirement::Standard),
                &DeviceContext::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::NoCapableVariant { .. }));
        assert!(err.to_string().contains("audio"));
    }

    #[test]
    fn without_mid_cost_falls_back_to_full() {
        let registry = ModelRegistry::new(vec![
            ModelVariant::new("small", ModelTier::Compact, [Modality::Image], 1),
            ModelVariant::new("large", ModelTier::Full, [Modality::Image], 5),
        ])
        .unwrap();
        let chosen = registry
            .select(
                &Task::identify_species(AccuracyRequirement::Standard),
                &device(0.8, false),
            )
            .unwrap();
        assert_eq!(chosen.id, "large");
    }

    #[test]
    fn ties_keep_registry_order() {
        let registry = ModelRegistry::new(vec![
            ModelVariant::new("first", ModelTier::Full, [Modality::Audio], 4),
            ModelVariant::new("second", ModelTier::Full, [Modality::Audio], 4),
        ])
        .unwrap();
        let task = Task::analyze_audio(AccuracyRequirement::High);
        assert_eq!(registry.select(&task, &device(1.0, true)).unwrap().id, "first");
        assert_eq!(registry.select(&task, &device(0.05, false)).unwrap().id, "first");
        let cheap = Task::analyze_audio(AccuracyRequirement::Low);
        assert_eq!(registry.select(&cheap, &device(0.05, false)).unwrap().id, "first");
    }

    #[test]
    fn cheapest_mid_cost_variant_wins() {
        let registry = ModelRegistry::new(vec![
            ModelVariant::new("tiny", ModelTier::Compact, [Modality::Image], 1),
            ModelVariant::new("mid-b", ModelTier::Compact, [Modality::Image], 4),
            ModelVariant::new("mid-a", ModelTier::Compact, [Modality::Image], 3),
            ModelVariant::new("huge", ModelTier::Full, [Modality::Image], 9),
        ])
        .unwrap();
        let chosen = registry
            .select(
                &Task::identify_species(AccuracyRequirement::Standard),
                &device(0.7, false),
            )
            .unwrap();
        assert_eq!(chosen.id, "mid-a");
    }

    #[test]
    fn capability_ranks_tier_before_cost() {
        let registry = ModelRegistry::new(vec![
            ModelVariant::new("pricey-compact", ModelTier::Compact, [Modality::Image], 10),
            ModelVariant::new("lean-full", ModelTier::Full, [Modality::Image], 6),
        ])
        .unwrap();
        let task = Task::identify_species(AccuracyRequirement::High);
        assert_eq!(
            registry.select(&task, &DeviceContext::default()).unwrap().id,
            "lean-full"
        );
    }

    #[test]
    fn malformed_registries_are_rejected() {
        assert!(ModelRegistry::new(Vec::new()).is_err());
        let dup = ModelRegistry::new(vec![
            ModelVariant::new("a", ModelTier::Compact, [Modality::Image], 1),
            ModelVariant::new("a", ModelTier::Full, [Modality::Image], 2),
        ]);
        assert!(matches!(dup, Err(RegistryError::Malformed(_))));
        let none = ModelRegistry::new(vec![ModelVariant::new(
            "mute",
            ModelTier::Compact,
            Vec::<Modality>::new(),
            1,
        )]);
        assert!(none.is_err());
    }
}
