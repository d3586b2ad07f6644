//! # verdant-catalog
//!
//! The reference catalogue: every subject (species) Verdant knows about, with
//! its conservation metadata.
//!
//! The catalogue is built once at startup from the embedded seed document,
//! optionally overlaid by an updates file with the same shape. Updates add new
//! subjects or replace existing ones by id. Anything malformed in either
//! document is fatal. After [`Catalogue::bootstrap`] returns, the catalogue is
//! immutable and safe to share across requests.

mod error;

pub use error::CatalogueError;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use verdant_core::entities::Subject;

/// Embedded seed catalogue.
const SEED: &str = include_str!("../seed/subjects.toml");

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    #[serde(default)]
    subjects: Vec<Subject>,
}

/// Read-only lookup table of subjects keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    subjects: Vec<Subject>,
    index: HashMap<String, usize>,
}

impl Catalogue {
    /// Load the embedded seed, then apply `updates` if given.
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::Malformed` if either document is malformed, or
    /// `CatalogueError::Io` if the updates file cannot be read.
    pub fn bootstrap(updates: Option<&Path>) -> Result<Self, CatalogueError> {
        let mut catalogue = Self::from_toml_str(SEED, "seed")?;

        if let Some(path) = updates {
            let text = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let overlay = Self::from_toml_str(&text, &path.display().to_string())?;
            let added = catalogue.apply(overlay);
            tracing::info!(
                path = %path.display(),
                added,
                total = catalogue.len(),
                "applied catalogue updates"
            );
        }

        tracing::debug!(subjects = catalogue.len(), "catalogue bootstrapped");
        Ok(catalogue)
    }

    /// Parse a catalogue document.
    ///
    /// `source_name` only labels error messages.
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::Malformed` for TOML errors, missing required
    /// fields, blank required strings, or duplicate ids.
    pub fn from_toml_str(text: &str, source_name: &str) -> Result<Self, CatalogueError> {
        let file: CatalogueFile = toml::from_str(text)
            .map_err(|e| CatalogueError::malformed(source_name, e.to_string()))?;

        let mut catalogue = Self::default();
        for subject in file.subjects {
            check_subject(&subject, source_name)?;
            if catalogue.contains(&subject.id) {
                return Err(CatalogueError::malformed(
                    source_name,
                    format!("duplicate subject id '{}'", subject.id),
                ));
            }
            catalogue.push(subject);
        }
        Ok(catalogue)
    }

    #[must_use]
    pub fn get(&self, subject_id: &str) -> Option<&Subject> {
        self.index.get(subject_id).map(|&i| &self.subjects[i])
    }

    #[must_use]
    pub fn contains(&self, subject_id: &str) -> bool {
        self.index.contains_key(subject_id)
    }

    /// Case-insensitive substring search over common name, scientific name,
    /// and category. Results are ordered by common name.
    #[must_use]
    pub fn search(&self, text: &str) -> Vec<&Subject> {
        let needle = text.trim().to_lowercase();
        let mut hits: Vec<&Subject> = self
            .subjects
            .iter()
            .filter(|s| {
                s.common_name.to_lowercase().contains(&needle)
                    || s.scientific_name.to_lowercase().contains(&needle)
                    || s.category.as_str().contains(&needle)
            })
            .collect();
        hits.sort_by_key(|s| s.common_name.to_lowercase());
        hits
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Subjects in load order (seed order, then appended updates).
    pub fn iter(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter()
    }

    fn push(&mut self, subject: Subject) {
        self.index.insert(subject.id.clone(), self.subjects.len());
        self.subjects.push(subject);
    }

    /// Overlay `other`, replacing by id. Returns how many subjects were new.
    fn apply(&mut self, other: Self) -> usize {
        let mut added = 0;
        for subject in other.subjects {
            if let Some(&i) = self.index.get(&subject.id) {
                self.subjects[i] = subject;
            } else {
                self.push(subject);
                added += 1;
            }
        }
        added
    }
}

fn check_subject(subject: &Subject, source_name: &str) -> Result<(), CatalogueError> {
    for (field, value) in [
        ("id", &subject.id),
        ("common_name", &subject.common_name),
        ("scientific_name", &subject.scientific_name),
        ("description", &subject.description),
        ("habitat", &subject.habitat),
    ] {
        if value.trim().is_empty() {
            return Err(CatalogueError::malformed(
                source_name,
                format!("subject '{}' has a blank {field}", subject.id),
            ));
        }
    }
    Ok(())
}
