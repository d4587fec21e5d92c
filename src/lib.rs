//! # Research Digest
//!
//! Searches arXiv and OpenAlex through two MCP tool servers, prints the
//! normalized results and optionally asks a local LLM (Ollama) for an answer
//! in which every claim cites a numbered source.
//!
//! ## Architecture
//!
//! - [`models`]: Normalized records and search criteria
//! - [`sources`]: arXiv and OpenAlex adapters behind the [`Source`] trait
//! - [`mcp`]: Tool servers, tool clients and result unpacking
//! - [`digest`]: The search-present-synthesize pipeline
//! - [`synthesis`]: Prompt building, generation and citation checks
//! - [`utils`]: HTTP client, relevance filter, logging
//! - [`config`]: Configuration management

pub mod config;
pub mod digest;
pub mod mcp;
pub mod models;
pub mod sources;
pub mod synthesis;
pub mod utils;

// Re-export commonly used types
pub use digest::{Digest, DigestRequest};
pub use models::{IndexRecord, PreprintRecord, SourceKind};
pub use sources::Source;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
