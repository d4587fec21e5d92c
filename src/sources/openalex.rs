//! OpenAlex research source implementation.
//!
//! Broad index searches drift: a query for "RAG" returns immunology papers
//! about the RAG genes next to retrieval-augmented generation work. The
//! adapter therefore over-fetches `max(per_page * 10, 50)` candidates, runs
//! them through the [`RelevanceFilter`] and keeps the first `per_page`
//! survivors in index relevance order.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::OpenAlexConfig;
use crate::models::{IndexRecord, SearchCriteria, SearchMode, SourceKind};
use crate::sources::{validate_criteria, Source, SourceError};
use crate::utils::{normalize_doi, HttpClient, RelevanceFilter};

pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// OpenAlex research source
///
/// Uses the OpenAlex REST API.
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    client: HttpClient,
    base_url: String,
    email: Option<String>,
    filter: RelevanceFilter,
}

impl OpenAlexSource {
    /// Create a new OpenAlex source with the default lexicon
    pub fn new() -> Result<Self, SourceError> {
        let mut source = Self::with_client(HttpClient::new()?, OPENALEX_API_BASE);
        source.email = std::env::var("OPENALEX_EMAIL").ok().filter(|e| !e.is_empty());
        Ok(source)
    }

    /// Create from the `[openalex]` config section and a relevance filter
    pub fn from_config(
        config: &OpenAlexConfig,
        filter: RelevanceFilter,
    ) -> Result<Self, SourceError> {
        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_client(client, config.base_url.clone())
            .with_email(config.email.clone())
            .with_filter(filter))
    }

    /// Create with a custom HTTP client and base URL (for testing)
    pub fn with_client(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: None,
            filter: RelevanceFilter::default(),
        }
    }

    /// Set the contact email (OpenAlex "polite pool")
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Replace the relevance filter
    pub fn with_filter(mut self, filter: RelevanceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Search works, filter and truncate to `per_page`
    pub async fn search_works(
        &self,
        query: &str,
        per_page: usize,
        mode: SearchMode,
    ) -> Result<Vec<IndexRecord>, SourceError> {
        self.search(&SearchCriteria::new(query, per_page).mode(mode))
            .await
    }

    /// Build request URL
    fn build_url(&self, query: &str, fetch_n: usize) -> String {
        let mut url = format!(
            "{}/works?search={}&per-page={}",
            self.base_url,
            urlencoding::encode(query),
            fetch_n
        );
        if let Some(ref email) = self.email {
            url = format!("{}&mailto={}", url, urlencoding::encode(email));
        }
        url
    }

    /// Fetch `fetch_n` candidate works in index relevance order
    async fn fetch_candidates(
        &self,
        query: &str,
        fetch_n: usize,
    ) -> Result<Vec<OpenAlexWork>, SourceError> {
        let url = self.build_url(query, fetch_n);
        tracing::debug!(url = %url, fetch_n, "Querying OpenAlex");

        let response = self
            .client
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to search OpenAlex: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "OpenAlex API returned status: {}",
                response.status()
            )));
        }

        let data: WorksResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        Ok(data.results)
    }
}

#[async_trait]
impl Source for OpenAlexSource {
    type Record = IndexRecord;

    fn kind(&self) -> SourceKind {
        SourceKind::OpenAlex
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<IndexRecord>, SourceError> {
        validate_criteria(criteria)?;

        let fetch_n = criteria.fetch_size();
        let candidates = self.fetch_candidates(&criteria.query, fetch_n).await?;
        let fetched = candidates.len();

        let records = select_records(
            &self.filter,
            &criteria.query,
            candidates,
            criteria.max_results,
            criteria.mode,
        );

        tracing::info!(
            fetched,
            kept = records.len(),
            mode = %criteria.mode,
            "OpenAlex search complete"
        );
        Ok(records)
    }
}

/// Filter candidates and map the first `per_page` survivors to records.
///
/// Order is preserved; fewer than `per_page` results is not an error.
pub fn select_records(
    filter: &RelevanceFilter,
    query: &str,
    candidates: impl IntoIterator<Item = OpenAlexWork>,
    per_page: usize,
    mode: SearchMode,
) -> Vec<IndexRecord> {
    let mut records = Vec::with_capacity(per_page);

    for work in candidates {
        if records.len() >= per_page {
            break;
        }

        let title = work.title.clone().unwrap_or_default();
        let verdict = filter.judge(query, &title, mode);
        if !verdict.is_keep() {
            tracing::trace!(title = %title, ?verdict, "Discarding candidate");
            continue;
        }

        records.push(work.into_record());
    }

    records
}

// ===== OpenAlex API Types =====

/// A work as returned by `/works`; every field is optional upstream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAlexWork {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub cited_by_count: Option<i64>,
    #[serde(default)]
    pub primary_location: Option<OALocation>,
}

impl OpenAlexWork {
    /// Map to the normalized record
    pub fn into_record(self) -> IndexRecord {
        let primary_location = self
            .primary_location
            .and_then(|l| l.source)
            .and_then(|s| s.display_name);

        IndexRecord {
            doi: normalize_doi(self.doi.as_deref()),
            title: self.title.unwrap_or_default(),
            publication_year: self.publication_year,
            cited_by_count: self.cited_by_count,
            primary_location,
            openalex_url: self.id.clone(),
            id: self.id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OALocation {
    #[serde(default)]
    pub source: Option<OASource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OASource {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<OpenAlexWork>,
}
