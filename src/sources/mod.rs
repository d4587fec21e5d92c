//! Source adapters with a small trait-based interface.
//!
//! Each adapter queries one upstream service and maps every hit into the
//! normalized record type for that source:
//!
//! - [`ArxivSource`] - arXiv Atom API, returns [`PreprintRecord`](crate::models::PreprintRecord)s
//! - [`OpenAlexSource`] - OpenAlex works API with over-fetch and relevance
//!   filtering, returns [`IndexRecord`](crate::models::IndexRecord)s
//!
//! Adapters never retry. Network, HTTP and parse failures are returned as
//! [`SourceError`] and surfaced once by the caller.

mod arxiv;
mod openalex;

pub use arxiv::{ArxivSource, ARXIV_API_URL, ARXIV_MAX_RESULTS, ARXIV_PDF_URL};
pub use openalex::{select_records, OpenAlexSource, OpenAlexWork, OPENALEX_API_BASE};

use crate::models::{SearchCriteria, SourceKind};
use async_trait::async_trait;
use serde::Serialize;

/// The Source trait defines the interface for both source adapters.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Normalized record type produced by this source
    type Record: Serialize + Send;

    /// Which upstream this adapter talks to
    fn kind(&self) -> SourceKind;

    /// Unique identifier for this source
    fn id(&self) -> &str {
        self.kind().id()
    }

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Search and return normalized records in upstream relevance order
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Self::Record>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (Atom, JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

/// Reject empty queries and zero result counts before hitting the network
pub(crate) fn validate_criteria(criteria: &SearchCriteria) -> Result<(), SourceError> {
    if criteria.query.trim().is_empty() {
        return Err(SourceError::InvalidRequest("Empty query".to_string()));
    }
    if criteria.max_results == 0 {
        return Err(SourceError::InvalidRequest(
            "max_results must be a positive integer".to_string(),
        ));
    }
    Ok(())
}
