//! Recommendation engine configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_max_actions() -> usize {
    6
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn default_coastal_keywords() -> Vec<String> {
    words(&["coast", "beach", "bay", "shore", "harbour", "harbor", "marine", "goa"])
}

fn default_urban_keywords() -> Vec<String> {
    words(&["city", "urban", "park", "town", "downtown", "metro", "campus"])
}

fn default_tropical_keywords() -> Vec<String> {
    words(&["tropical", "rainforest", "jungle", "amazon", "kerala", "borneo", "western ghats"])
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendationConfig {
    /// Maximum number of actions returned per finding.
    #[serde(default = "default_max_actions")]
    pub max_actions: usize,

    /// Place-name keywords that mark a location as coastal.
    #[serde(default = "default_coastal_keywords")]
    pub coastal_keywords: Vec<String>,

    /// Place-name keywords that mark a location as urban.
    #[serde(default = "default_urban_keywords")]
    pub urban_keywords: Vec<String>,

    /// Place-name keywords that mark a location as tropical.
    #[serde(default = "default_tropical_keywords")]
    pub tropical_keywords: Vec<String>,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_actions: default_max_actions(),
            coastal_keywords: default_coastal_keywords(),
            urban_keywords: default_urban_keywords(),
            tropical_keywords: default_tropical_keywords(),
        }
    }
}

impl RecommendationConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_actions == 0 {
            return Err(ConfigError::invalid(
                "recommendations.max_actions",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = RecommendationConfig::default();
        assert_eq!(config.max_actions, 6);
        assert!(config.urban_keywords.iter().any(|k| k == "park"));
        assert!(config.coastal_keywords.iter().any(|k| k == "coast"));
    }
}
