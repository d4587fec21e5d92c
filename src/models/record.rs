//! Normalized records produced by the source adapters.
//!
//! Both record types serialize with the exact field names carried over the
//! MCP tool boundary, so the client can render and embed them without
//! knowing which server produced them.

use serde::{Deserialize, Serialize};

/// The upstream source a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Arxiv,
    OpenAlex,
}

impl SourceKind {
    /// Display name, also used as the citation tag prefix (`[arXiv-1]`)
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Arxiv => "arXiv",
            SourceKind::OpenAlex => "OpenAlex",
        }
    }

    /// Source identifier
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Arxiv => "arxiv",
            SourceKind::OpenAlex => "openalex",
        }
    }

    /// Build the inline citation tag for the 1-based `position` in this source's list
    pub fn citation_tag(&self, position: usize) -> String {
        format!("[{}-{}]", self.name(), position)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A preprint hit from arXiv
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprintRecord {
    pub title: String,

    /// Author names in listed order
    #[serde(default)]
    pub authors: Vec<String>,

    /// Publication timestamp (RFC 3339)
    pub published: Option<String>,

    pub pdf_url: String,

    /// Canonical entry id (the `abs` URL)
    pub entry_id: String,

    /// Abstract
    #[serde(default)]
    pub summary: String,
}

/// A work from the OpenAlex index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: Option<String>,

    /// DOI without the `https://doi.org/` resolver prefix
    pub doi: Option<String>,

    pub title: String,

    pub publication_year: Option<i32>,

    pub cited_by_count: Option<i64>,

    /// Display name of the primary venue
    pub primary_location: Option<String>,

    pub openalex_url: Option<String>,
}
