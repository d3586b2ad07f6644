//! Shared fixtures for store tests.

use verdant_catalog::Catalogue;
use verdant_core::entities::{
    AudioAnalysis, ConservationAction, Finding, MediaRef, SpeciesDiscovery,
};
use verdant_core::location::Location;
use verdant_core::score::Score;

use crate::FindingStore;

/// In-memory store with the built-in catalogue synced.
pub async fn seeded_store() -> (FindingStore, Catalogue) {
    let store = FindingStore::in_memory().await.unwrap();
    let catalogue = Catalogue::bootstrap(None).unwrap();
    store.sync_catalogue(&catalogue).await.unwrap();
    (store, catalogue)
}

pub fn discovery(catalogue: &Catalogue, subject_id: &str, confidence: f64) -> Finding {
    let subject = catalogue.get(subject_id).unwrap();
    SpeciesDiscovery::new(
        subject,
        Score::new(confidence).unwrap(),
        MediaRef::new(format!("captures/{subject_id}.jpg")),
        Some(Location::new(12.97, 77.59, "Cubbon Park, Bengaluru").unwrap()),
    )
    .into()
}

pub fn audio(score: f64, subjects: &[&str]) -> Finding {
    AudioAnalysis::new(
        MediaRef::new("captures/dawn.wav"),
        45.0,
        ["birdsong".to_string()].into_iter().collect(),
        Score::new(score).unwrap(),
        subjects.iter().map(|s| (*s).to_string()).collect(),
        None,
    )
    .unwrap()
    .into()
}

pub fn action(subject: Option<&str>, description: &str) -> ConservationAction {
    ConservationAction::new("habitat", description, subject.map(String::from), 2, None).unwrap()
}
