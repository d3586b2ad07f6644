//! Ecosystem fusion of per-modality habitat signals.
//!
//! Each modality present gets an equal weight. A modality whose signal is
//! empty (no indicators, or all zero) hands its weight to the others. Each
//! indicator is the weighted average over the modalities that report it.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use verdant_core::enums::Modality;
use verdant_core::score::Score;

use crate::pipeline::HabitatSignal;

/// Result of fusing one or more habitat signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedHabitat {
    pub indicators: BTreeMap<String, Score>,
    /// Mean of the fused indicators.
    pub overall_health: Score,
    pub biodiversity_index: Score,
    pub threats: Vec<String>,
    pub strengths: Vec<String>,
    /// Weight each contributing modality ended up with.
    pub weights: BTreeMap<Modality, f64>,
}

/// Fuse `signals`. Returns `None` when no modality carries any signal.
#[must_use]
pub fn fuse(signals: &[(Modality, &HabitatSignal)]) -> Option<FusedHabitat> {
    let contributing: Vec<(Modality, &HabitatSignal)> = signals
        .iter()
        .filter(|(_, signal)| signal.has_signal())
        .copied()
        .collect();
    if contributing.is_empty() {
        return None;
    }

    let share = 1.0 / f64::from(u32::try_from(contributing.len()).unwrap_or(u32::MAX));
    let weights: BTreeMap<Modality, f64> = contributing.iter().map(|(m, _)| (*m, share)).collect();

    let mut sums: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for (_, signal) in &contributing {
        for (name, score) in &signal.indicators {
            let entry = sums.entry(name.as_str()).or_insert((0.0, 0.0));
            entry.0 += share * score.value();
            entry.1 += share;
        }
    }
    let indicators: BTreeMap<String, Score> = sums
        .into_iter()
        .map(|(name, (weighted, weight))| (name.to_string(), Score::saturating(weighted / weight)))
        .collect();

    let indicator_count = f64::from(u32::try_from(indicators.len()).unwrap_or(u32::MAX));
    let overall_health =
        Score::saturating(indicators.values().map(|s| s.value()).sum::<f64>() / indicator_count);
    let biodiversity_index = Score::saturating(
        contributing
            .iter()
            .map(|(_, signal)| share * signal.biodiversity_estimate.value())
            .sum(),
    );

    Some(FusedHabitat {
        indicators,
        overall_health,
        biodiversity_index,
        threats: union_ignore_case(contributing.iter().map(|(_, s)| s.threats.as_slice())),
        strengths: union_ignore_case(contributing.iter().map(|(_, s)| s.strengths.as_slice())),
        weights,
    })
}

/// Concatenate `lists`, dropping case-insensitive repeats. The first spelling wins.
fn union_ignore_case<'a>(lists: impl Iterator<Item = &'a [String]>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in lists.flatten() {
        let trimmed = item.trim();
        if !trimmed.is_empty() && seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    out
}
