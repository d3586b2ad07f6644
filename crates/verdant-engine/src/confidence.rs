//! Species confidence from ranked candidates.

use verdant_core::score::Score;

use crate::pipeline::SubjectCandidate;

/// Tolerance for the margin comparison, so `0.91 - 0.86` counts as `0.05`.
const MARGIN_EPSILON: f64 = 1e-9;

/// How a top candidate's score becomes the reported confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceRule {
    /// Lead over the runner-up required to report the raw top score.
    pub separation_margin: f64,
    /// Ceiling applied when the lead is smaller than the margin.
    pub ambiguity_cap: Score,
}

impl Default for ConfidenceRule {
    fn default() -> Self {
        Self {
            separation_margin: 0.05,
            ambiguity_cap: Score::saturating(0.6),
        }
    }
}

impl ConfidenceRule {
    /// Rank `candidates` by score (stable, so equal scores keep their order)
    /// and return the winner with its reported confidence. `None` for an
    /// empty list.
    #[must_use]
    pub fn resolve(&self, mut candidates: Vec<SubjectCandidate>) -> Option<(SubjectCandidate, Score)> {
        candidates.sort_by(|a, b| b.score.value().total_cmp(&a.score.value()));
        let mut ranked = candidates.into_iter();
        let top = ranked.next()?;
        let confidence = match ranked.next() {
            Some(runner_up)
                if top.score.value() - runner_up.score.value()
                    < self.separation_margin - MARGIN_EPSILON =>
            {
                top.score.min(self.ambiguity_cap)
            }
            _ => top.score,
        };
        Some((top, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn candidates(scores: &[f64]) -> Vec<SubjectCandidate> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| SubjectCandidate::new(format!("s{i}"), Score::new(*s).unwrap()))
            .collect()
    }

    #[rstest]
    #[case::ambiguous(&[0.91, 0.89], 0.6)]
    #[case::clear_lead(&[0.91, 0.80], 0.91)]
    #[case::exactly_margin(&[0.91, 0.86], 0.91)]
    #[case::single(&[0.42], 0.42)]
    #[case::ambiguous_but_low(&[0.40, 0.39], 0.40)]
    #[case::unsorted_input(&[0.30, 0.95, 0.94], 0.6)]
    fn confidence_cases(#[case] scores: &[f64], #[case] expected: f64) {
        let (_, confidence) = ConfidenceRule::default().resolve(candidates(scores)).unwrap();
        assert!((confidence.value() - expected).abs() < 1e-12, "{scores:?} → {confidence:?}");
    }

    #[test]
    fn winner_is_highest_and_ties_keep_order() {
        let (top, _) = ConfidenceRule::default()
            .resolve(candidates(&[0.5, 0.7, 0.7]))
            .unwrap();
        assert_eq!(top.subject_ref, "s1");
    }

    #[test]
    fn no_candidates_no_winner() {
        assert!(ConfidenceRule::default().resolve(Vec::new()).is_none());
    }
}
