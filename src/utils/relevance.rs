//! Keyword relevance filter for bibliographic index results.
//!
//! Broad index searches for "RAG" match both retrieval-augmented generation
//! papers and the unrelated RAG gene family. The filter applies two rules to
//! each candidate title:
//!
//! 1. When the query contains the ambiguous acronym, titles containing any
//!    biological-noise term are dropped (regardless of mode).
//! 2. In [`SearchMode::Precision`], titles must contain at least one domain
//!    keyword.
//!
//! Terms are plain lowercase substrings of the title by default, so
//! "immun" covers "immunity" and "rag" covers "GraphRAG". Setting
//! `match = "word"` in the lexicon restricts terms to whole words instead.
//! The query check is always a substring test.
//!
//! The lexicons are plain configuration data so they can be replaced from
//! the config file or in tests.

use serde::{Deserialize, Serialize};

use crate::models::SearchMode;

/// Default ambiguous acronym
pub const DEFAULT_ACRONYM: &str = "rag";

/// Default AI/ML domain keywords
pub const DEFAULT_AI_KEYWORDS: &[&str] = &[
    "retrieval",
    "generation",
    "rag",
    "language model",
    "llm",
    "agent",
    "benchmark",
    "transformer",
];

/// Default biological-sense noise terms
pub const DEFAULT_BIO_NOISE: &[&str] = &[
    "mice",
    "mouse",
    "murine",
    "gene",
    "genes",
    "genetic",
    "immun",
    "chemotherapy",
    "hiv",
    "cancer",
    "tumor",
];

/// How lexicon terms are located in a title
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermMatch {
    /// Anywhere in the title
    #[default]
    Substring,
    /// Only as a whole word
    Word,
}

/// Keyword lists driving the relevance filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceLexicon {
    /// Acronym whose presence in the query enables the noise rule
    #[serde(default = "default_acronym")]
    pub acronym: String,

    /// Terms of which at least one must appear in a title in precision mode
    #[serde(default = "default_ai_keywords")]
    pub ai_keywords: Vec<String>,

    /// Terms that mark a title as the biological sense of the acronym
    #[serde(default = "default_bio_noise")]
    pub bio_noise: Vec<String>,

    /// Term matching rule for both lists
    #[serde(default, rename = "match")]
    pub term_match: TermMatch,
}

impl Default for RelevanceLexicon {
    fn default() -> Self {
        Self {
            acronym: default_acronym(),
            ai_keywords: default_ai_keywords(),
            bio_noise: default_bio_noise(),
            term_match: TermMatch::default(),
        }
    }
}

fn default_acronym() -> String {
    DEFAULT_ACRONYM.to_string()
}

fn default_ai_keywords() -> Vec<String> {
    DEFAULT_AI_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

fn default_bio_noise() -> Vec<String> {
    DEFAULT_BIO_NOISE.iter().map(|s| s.to_string()).collect()
}

/// Why a candidate was kept or discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    /// Acronym query and a biological-noise term in the title
    AcronymNoise,
    /// Precision mode and no domain keyword in the title
    OffTopic,
}

impl Verdict {
    pub fn is_keep(&self) -> bool {
        matches!(self, Verdict::Keep)
    }
}

/// A lowercase lexicon term
#[derive(Debug, Clone, PartialEq, Eq)]
struct Term(String);

impl Term {
    fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim().to_lowercase();
        (!text.is_empty()).then_some(Self(text))
    }

    /// `haystack` must already be lowercase
    fn matches(&self, haystack: &str, rule: TermMatch) -> bool {
        match rule {
            TermMatch::Substring => haystack.contains(&self.0),
            TermMatch::Word => haystack.match_indices(&self.0).any(|(start, _)| {
                let end = start + self.0.len();
                let left = haystack[..start]
                    .chars()
                    .next_back()
                    .map_or(true, |c| !c.is_alphanumeric());
                let right = haystack[end..]
                    .chars()
                    .next()
                    .map_or(true, |c| !c.is_alphanumeric());
                left && right
            }),
        }
    }
}

fn compile(terms: &[String]) -> Vec<Term> {
    terms.iter().filter_map(|t| Term::parse(t)).collect()
}

/// Two-rule keyword gate over candidate titles
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    acronym: String,
    ai_keywords: Vec<Term>,
    bio_noise: Vec<Term>,
    rule: TermMatch,
}

impl RelevanceFilter {
    /// Build a filter from a lexicon (terms are matched case-insensitively)
    pub fn new(lexicon: &RelevanceLexicon) -> Self {
        Self {
            acronym: lexicon.acronym.trim().to_lowercase(),
            ai_keywords: compile(&lexicon.ai_keywords),
            bio_noise: compile(&lexicon.bio_noise),
            rule: lexicon.term_match,
        }
    }

    /// Whether the query text contains the ambiguous acronym
    pub fn query_is_ambiguous(&self, query: &str) -> bool {
        !self.acronym.is_empty() && query.to_lowercase().contains(&self.acronym)
    }

    /// Judge a candidate title for a query
    pub fn judge(&self, query: &str, title: &str, mode: SearchMode) -> Verdict {
        let title = title.to_lowercase();

        if self.query_is_ambiguous(query) && self.bio_noise.iter().any(|t| t.matches(&title, self.rule)) {
            return Verdict::AcronymNoise;
        }

        if mode == SearchMode::Precision && !self.ai_keywords.iter().any(|k| k.matches(&title, self.rule)) {
            return Verdict::OffTopic;
        }

        Verdict::Keep
    }

    /// Whether a candidate title survives both rules
    pub fn admits(&self, query: &str, title: &str, mode: SearchMode) -> bool {
        self.judge(query, title, mode).is_keep()
    }
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(&RelevanceLexicon::default())
    }
}
