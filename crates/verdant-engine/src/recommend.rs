//! Conservation action recommendations.
//!
//! [`RecommendationEngine::recommend`] is pure: the same finding, subject and
//! location always produce the same list. Actions are gathered in three
//! groups, in this order:
//!
//! 1. base actions from the subject's catalogue entry, weighted by its
//!    conservation status;
//! 2. finding-derived actions for findings without a subject (low
//!    biodiversity, poor health, recorded threats);
//! 3. location actions for every context the [`LocationClassifier`] reports.
//!
//! The list is then stably sorted by descending impact and truncated.

use std::collections::BTreeSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use verdant_config::RecommendationConfig;
use verdant_core::entities::{ConservationAction, Finding, Subject};
use verdant_core::enums::{ConservationStatus, Difficulty, EnvironmentalHealth, Impact, Timeframe};
use verdant_core::errors::CoreError;
use verdant_core::location::Location;

/// Threat-mitigation actions emitted per finding, at most.
const MAX_THREAT_ACTIONS: usize = 3;

/// Below this, a biodiversity score or overall health calls for restoration.
const RESTORATION_THRESHOLD: f64 = 0.5;

/// A recommended conservation action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    pub action_type: String,
    pub description: String,
    pub impact: Impact,
    pub difficulty: Difficulty,
    pub timeframe: Timeframe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_ref: Option<String>,
}

impl Action {
    fn new(
        action_type: &str,
        description: impl Into<String>,
        impact: Impact,
        difficulty: Difficulty,
        timeframe: Timeframe,
    ) -> Self {
        Self {
            action_type: action_type.to_string(),
            description: description.into(),
            impact,
            difficulty,
            timeframe,
            subject_ref: None,
        }
    }

    /// Integer impact stored on conservation action findings.
    #[must_use]
    pub const fn impact_score(&self) -> i64 {
        self.impact.score()
    }

    /// The persisted form of this action.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` for a blank description.
    pub fn to_finding(&self, location: Option<Location>) -> Result<ConservationAction, CoreError> {
        ConservationAction::new(
            self.action_type.clone(),
            self.description.clone(),
            self.subject_ref.clone(),
            self.impact_score(),
            location,
        )
    }
}

// ---------------------------------------------------------------------------
// Location classification
// ---------------------------------------------------------------------------

/// Broad setting of a location that warrants extra actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationContext {
    Coastal,
    Urban,
    Tropical,
}

impl LocationContext {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coastal => "coastal",
            Self::Urban => "urban",
            Self::Tropical => "tropical",
        }
    }
}

impl fmt::Display for LocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides which [`LocationContext`]s apply to a location.
pub trait LocationClassifier: Send + Sync {
    fn classify(&self, location: &Location) -> BTreeSet<LocationContext>;
}

/// Matches the lowercased place name against keyword lists.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<(LocationContext, Vec<String>)>,
}

impl KeywordClassifier {
    #[must_use]
    pub fn new(config: &RecommendationConfig) -> Self {
        let lower = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        Self {
            keywords: vec![
                (LocationContext::Coastal, lower(&config.coastal_keywords)),
                (LocationContext::Urban, lower(&config.urban_keywords)),
                (LocationContext::Tropical, lower(&config.tropical_keywords)),
            ],
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(&RecommendationConfig::default())
    }
}

impl LocationClassifier for KeywordClassifier {
    fn classify(&self, location: &Location) -> BTreeSet<LocationContext> {
        let name = location.name_lowercase();
        self.keywords
            .iter()
            .filter(|(_, words)| words.iter().any(|w| name.contains(w.as_str())))
            .map(|(context, _)| *context)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Builds ranked action lists for findings.
pub struct RecommendationEngine {
    classifier: Box<dyn LocationClassifier>,
    max_actions: usize,
}

impl fmt::Debug for RecommendationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommendationEngine")
            .field("max_actions", &self.max_actions)
            .finish_non_exhaustive()
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::from_config(&RecommendationConfig::default())
    }
}

impl RecommendationEngine {
    #[must_use]
    pub fn new(classifier: Box<dyn LocationClassifier>, max_actions: usize) -> Self {
        Self {
            classifier,
            max_actions: max_actions.max(1),
        }
    }

    /// Keyword classifier and limit from configuration.
    #[must_use]
    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self::new(Box::new(KeywordClassifier::new(config)), config.max_actions)
    }

    #[must_use]
    pub const fn max_actions(&self) -> usize {
        self.max_actions
    }

    /// Actions for `finding`, highest impact first, at most `max_actions`.
    #[must_use]
    pub fn recommend(
        &self,
        finding: &Finding,
        subject: Option<&Subject>,
        location: Option<&Location>,
    ) -> Vec<Action> {
        let mut actions = match subject {
            Some(subject) => subject_actions(subject),
            None => finding_actions(finding),
        };
        if let Some(location) = location {
            for context in self.classifier.classify(location) {
                actions.extend(location_actions(context));
            }
        }
        rank(actions, self.max_actions)
    }
}

/// Stable sort by descending impact, then truncate.
#[must_use]
pub fn rank(mut actions: Vec<Action>, max_actions: usize) -> Vec<Action> {
    actions.sort_by(|a, b| b.impact.cmp(&a.impact));
    actions.truncate(max_actions);
    actions
}

const fn status_impact(status: ConservationStatus) -> Impact {
    match status {
        ConservationStatus::Endangered => Impact::VeryHigh,
        ConservationStatus::Vulnerable => Impact::High,
        ConservationStatus::NearThreatened | ConservationStatus::Unknown => Impact::Medium,
        ConservationStatus::LeastConcern => Impact::Low,
    }
}

const fn effort_for(impact: Impact) -> (Difficulty, Timeframe) {
    match impact {
        Impact::VeryHigh => (Difficulty::Hard, Timeframe::LongTerm),
        Impact::High => (Difficulty::Moderate, Timeframe::LongTerm),
        Impact::Medium => (Difficulty::Moderate, Timeframe::ShortTerm),
        Impact::Low => (Difficulty::Easy, Timeframe::Immediate),
    }
}

fn subject_actions(subject: &Subject) -> Vec<Action> {
    let impact = status_impact(subject.conservation_status);
    let (difficulty, timeframe) = effort_for(impact);
    subject
        .recommended_actions
        .iter()
        .filter(|d| !d.trim().is_empty())
        .map(|description| Action {
            subject_ref: Some(subject.id.clone()),
            ..Action::new("species_protection", description.trim(), impact, difficulty, timeframe)
        })
        .collect()
}

fn restoration() -> Action {
    Action::new(
        "habitat_restoration",
        "Restore native vegetation and food plants to lift local biodiversity",
        Impact::High,
        Difficulty::Moderate,
        Timeframe::LongTerm,
    )
}

fn monitoring() -> Action {
    Action::new(
        "monitoring",
        "Repeat the survey at another time of day to track how the site changes",
        Impact::Low,
        Difficulty::Easy,
        Timeframe::ShortTerm,
    )
}

fn finding_actions(finding: &Finding) -> Vec<Action> {
    let mut actions = Vec::new();
    match finding {
        Finding::AudioAnalysis(audio) => {
            if audio.biodiversity_score.value() < RESTORATION_THRESHOLD
                || audio.environmental_health == EnvironmentalHealth::Poor
            {
                actions.push(restoration());
            }
        }
        Finding::EcosystemAssessment(eco) => {
            if eco.overall_health.value() < RESTORATION_THRESHOLD
                || eco.biodiversity_index.value() < RESTORATION_THRESHOLD
            {
                actions.push(restoration());
            }
            actions.extend(eco.threats.iter().take(MAX_THREAT_ACTIONS).map(|threat| {
                Action::new(
                    "threat_mitigation",
                    format!("Work with local groups to reduce {}", threat.to_lowercase()),
                    Impact::High,
                    Difficulty::Moderate,
                    Timeframe::ShortTerm,
                )
            }));
        }
        Finding::SpeciesDiscovery(_) | Finding::ConservationAction(_) => {}
    }
    if matches!(
        finding,
        Finding::AudioAnalysis(_) | Finding::EcosystemAssessment(_)
    ) {
        actions.push(monitoring());
    }
    actions
}

fn location_actions(context: LocationContext) -> Vec<Action> {
    match context {
        LocationContext::Coastal => vec![
            Action::new(
                "coastal_cleanup",
                "Join or organise a shoreline clean-up to keep plastics out of the water",
                Impact::High,
                Difficulty::Easy,
                Timeframe::Immediate,
            ),
            Action::new(
                "coastal_lighting",
                "Keep beach-facing lights dim during nesting season",
                Impact::Medium,
                Difficulty::Easy,
                Timeframe::ShortTerm,
            ),
        ],
        LocationContext::Urban => vec![
            Action::new(
                "urban_habitat",
                "Plant native flowering species on balconies, verges and park edges",
                Impact::Medium,
                Difficulty::Easy,
                Timeframe::Immediate,
            ),
            Action::new(
                "urban_water",
                "Set out shallow water bowls for birds and pollinators in dry months",
                Impact::Low,
                Difficulty::Easy,
                Timeframe::Immediate,
            ),
        ],
        LocationContext::Tropical => vec![Action::new(
            "forest_protection",
            "Support community forest protection and avoid products linked to deforestation",
            Impact::High,
            Difficulty::Moderate,
            Timeframe::LongTerm,
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use verdant_catalog::Catalogue;
    use verdant_core::entities::{AudioAnalysis, EcosystemAssessment, MediaRef, SpeciesDiscovery};
    use verdant_core::score::Score;

    fn action(description: &str, impact: Impact) -> Action {
        Action::new("test", description, impact, Difficulty::Easy, Timeframe::Immediate)
    }

    fn place(name: &str) -> Location {
        Location::new(15.3, 74.1, name).unwrap()
    }

    fn audio(score: f64) -> Finding {
        AudioAnalysis::new(
            MediaRef::new("captures/park.wav"),
            45.0,
            BTreeSet::new(),
            Score::new(score).unwrap(),
            Vec::new(),
            None,
        )
        .unwrap()
        .into()
    }

    #[test]
    fn rank_orders_by_descending_impact() {
        let ranked = rank(
            vec![
                action("m", Impact::Medium),
                action("h", Impact::High),
                action("v", Impact::VeryHigh),
            ],
            6,
        );
        let impacts: Vec<Impact> = ranked.iter().map(|a| a.impact).collect();
        assert_eq!(impacts, vec![Impact::VeryHigh, Impact::High, Impact::Medium]);
    }

    #[test]
    fn rank_keeps_ties_in_order_and_truncates() {
        let ranked = rank(
            vec![
                action("a", Impact::Low),
                action("b", Impact::High),
                action("c", Impact::Low),
                action("d", Impact::High),
            ],
            3,
        );
        let order: Vec<&str> = ranked.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(order, vec!["b", "d", "a"]);
    }

    #[test]
    fn keyword_classifier_matches_place_names() {
        let classifier = KeywordClassifier::default();
        assert_eq!(
            classifier.classify(&place("Urban Park")),
            BTreeSet::from([LocationContext::Urban])
        );
        assert_eq!(
            classifier.classify(&place("Calangute Beach, Goa")),
            BTreeSet::from([LocationContext::Coastal])
        );
        assert!(classifier.classify(&place("Deccan Plateau")).is_empty());
    }

    #[test]
    fn endangered_subject_actions_are_very_high_and_keep_location_extras() {
        let catalogue = Catalogue::bootstrap(None).unwrap();
        let tiger = catalogue.get("bengal-tiger").unwrap();
        let finding: Finding = SpeciesDiscovery::new(
            tiger,
            Score::new(0.9).unwrap(),
            MediaRef::new("captures/tiger.jpg"),
            None,
        )
        .into();

        let engine = RecommendationEngine::new(Box::new(KeywordClassifier::default()), 20);
        let actions = engine.recommend(&finding, Some(tiger), Some(&place("Sundarbans Coast")));

        let base: Vec<&Action> = actions
            .iter()
            .filter(|a| a.action_type == "species_protection")
            .collect();
        assert_eq!(base.len(), tiger.recommended_actions.len());
        assert!(base.iter().all(|a| a.impact == Impact::VeryHigh));
        assert!(base.iter().all(|a| a.subject_ref.as_deref() == Some("bengal-tiger")));
        assert!(actions.iter().any(|a| a.action_type == "coastal_cleanup"));
        assert_eq!(actions[0].impact, Impact::VeryHigh);
    }

    #[test]
    fn low_biodiversity_audio_gets_restoration() {
        let engine = RecommendationEngine::default();
        let actions = engine.recommend(&audio(0.2), None, None);
        assert_eq!(actions[0].action_type, "habitat_restoration");

        let healthy = engine.recommend(&audio(0.9), None, None);
        assert!(healthy.iter().all(|a| a.action_type != "habitat_restoration"));
    }

    #[test]
    fn ecosystem_threats_get_mitigation() {
        let finding: Finding = EcosystemAssessment::new(
            Some(MediaRef::new("captures/wetland.jpg")),
            None,
            Score::new(0.7).unwrap(),
            Score::new(0.7).unwrap(),
            [("water_presence".to_string(), Score::new(0.7).unwrap())].into(),
            vec!["Plastic pollution".into(), "Invasive weeds".into()],
            Vec::new(),
            None,
        )
        .unwrap()
        .into();

        let actions = RecommendationEngine::default().recommend(&finding, None, None);
        let mitigation: Vec<&str> = actions
            .iter()
            .filter(|a| a.action_type == "threat_mitigation")
            .map(|a| a.description.as_str())
            .collect();
        assert_eq!(
            mitigation,
            vec![
                "Work with local groups to reduce plastic pollution",
                "Work with local groups to reduce invasive weeds",
            ]
        );
    }

    #[test]
    fn output_respects_max_actions() {
        let engine = RecommendationEngine::new(Box::new(KeywordClassifier::default()), 2);
        let actions = engine.recommend(&audio(0.1), None, Some(&place("Urban Beach Park")));
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn recommend_is_deterministic() {
        let engine = RecommendationEngine::default();
        let location = place("Kerala Coast");
        let finding = audio(0.4);
        assert_eq!(
            engine.recommend(&finding, None, Some(&location)),
            engine.recommend(&finding, None, Some(&location))
        );
    }

    #[test]
    fn actions_convert_to_findings() {
        let mut a = action("Plant neem saplings", Impact::High);
        a.subject_ref = Some("neem".into());
        let finding = a.to_finding(None).unwrap();
        assert_eq!(finding.impact_score, 3);
        assert_eq!(finding.related_subject_ref.as_deref(), Some("neem"));
        assert!(!finding.completed);
    }
}
