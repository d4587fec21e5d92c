//! Utility modules supporting the source adapters.
//!
//! - [`HttpClient`]: shared reqwest client with timeouts and a crate user agent
//! - [`RelevanceFilter`]: keyword gate for bibliographic index results
//! - [`RelevanceLexicon`]: the keyword lists the filter is built from
//! - [`normalize_doi`]: strip the DOI resolver prefix
//! - [`init_tracing`]: stderr logging shared by both binaries
//!
//! # Relevance filtering
//!
//! ```rust
//! use research_digest::models::SearchMode;
//! use research_digest::utils::RelevanceFilter;
//!
//! let filter = RelevanceFilter::default();
//! assert!(!filter.admits("RAG", "RAG gene rearrangement in mice", SearchMode::Recall));
//! assert!(filter.admits("RAG", "GraphRAG: retrieval over knowledge graphs", SearchMode::Precision));
//! ```

mod doi;
mod http;
mod logging;
mod relevance;

pub use doi::{normalize_doi, DOI_RESOLVER_PREFIX};
pub use http::{HttpClient, DEFAULT_TIMEOUT_SECS};
pub use logging::{default_filter, init_tracing};
pub use relevance::{
    RelevanceFilter, RelevanceLexicon, TermMatch, Verdict, DEFAULT_ACRONYM, DEFAULT_AI_KEYWORDS,
    DEFAULT_BIO_NOISE,
};
