//! Search criteria shared by both adapters.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Over-fetch multiplier applied before relevance filtering
pub const FETCH_MULTIPLIER: usize = 10;

/// Minimum number of candidates fetched before relevance filtering
pub const FETCH_FLOOR: usize = 50;

/// Number of upstream candidates to request for `per_page` final results.
///
/// Filtering discards candidates, so the index is asked for
/// `max(per_page * 10, 50)`.
pub fn fetch_size(per_page: usize) -> usize {
    per_page.saturating_mul(FETCH_MULTIPLIER).max(FETCH_FLOOR)
}

/// Filtering mode for the bibliographic index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchMode {
    /// Require an AI/ML keyword in the title
    #[default]
    #[serde(rename = "ai")]
    Precision,
    /// Only the acronym disambiguation rule applies
    #[serde(rename = "general")]
    Recall,
}

impl SearchMode {
    /// Name used in tool arguments
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Precision => "ai",
            SearchMode::Recall => "general",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ai" | "precision" => Ok(SearchMode::Precision),
            "general" | "recall" => Ok(SearchMode::Recall),
            other => Err(format!(
                "Unknown search mode '{}' (expected 'ai' or 'general')",
                other
            )),
        }
    }
}

/// Search parameters for a single adapter call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Query text
    pub query: String,

    /// Maximum number of records to return
    pub max_results: usize,

    /// Filtering mode (ignored by arXiv)
    #[serde(default)]
    pub mode: SearchMode,
}

impl SearchCriteria {
    /// Create criteria with the default mode
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
            mode: SearchMode::default(),
        }
    }

    /// Set the filtering mode
    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Candidates to fetch from the index for these criteria
    pub fn fetch_size(&self) -> usize {
        fetch_size(self.max_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_size_floor() {
        assert_eq!(fetch_size(1), 50);
        assert_eq!(fetch_size(3), 50);
        assert_eq!(fetch_size(5), 50);
    }

    #[test]
    fn test_fetch_size_multiplier() {
        assert_eq!(fetch_size(6), 60);
        assert_eq!(fetch_size(20), 200);
        assert_eq!(SearchCriteria::new("rag", 8).fetch_size(), 80);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("ai".parse::<SearchMode>().unwrap(), SearchMode::Precision);
        assert_eq!("General".parse::<SearchMode>().unwrap(), SearchMode::Recall);
        assert!("loose".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(
            serde_json::to_value(SearchMode::Precision).unwrap(),
            serde_json::json!("ai")
        );
        assert_eq!(SearchMode::Recall.to_string(), "general");
    }
}
