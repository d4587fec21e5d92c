//! arXiv research source implementation.

use async_trait::async_trait;
use feed_rs::parser;

use std::time::Duration;

use crate::config::ArxivConfig;
use crate::models::{PreprintRecord, SearchCriteria, SourceKind};
use crate::sources::{validate_criteria, Source, SourceError};
use crate::utils::HttpClient;

/// Base URL for arXiv API
pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
/// Base URL for arXiv PDFs
pub const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";
/// Upper bound on results per request
pub const ARXIV_MAX_RESULTS: usize = 200;

/// arXiv research source
///
/// Searches by topic, sorted by relevance. Every feed entry becomes a
/// [`PreprintRecord`]; nothing is filtered.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: HttpClient,
    api_url: String,
}

impl ArxivSource {
    /// Create a new arXiv source
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(HttpClient::new()?, ARXIV_API_URL))
    }

    /// Create from the `[arxiv]` config section
    pub fn from_config(config: &ArxivConfig) -> Result<Self, SourceError> {
        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Create with a custom HTTP client and API URL (for testing)
    pub fn with_client(client: HttpClient, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    /// Search arXiv for a topic
    pub async fn search_topic(
        &self,
        topic: &str,
        max_results: usize,
    ) -> Result<Vec<PreprintRecord>, SourceError> {
        self.search(&SearchCriteria::new(topic, max_results)).await
    }

    /// Build the query URL (relevance order, descending)
    fn build_url(&self, criteria: &SearchCriteria) -> String {
        format!(
            "{}?search_query={}&max_results={}&sortBy=relevance&sortOrder=descending",
            self.api_url,
            urlencoding::encode(criteria.query.trim()),
            criteria.max_results.min(ARXIV_MAX_RESULTS)
        )
    }

    /// Extract the short id (`2301.12345v1`) from an entry id URL
    fn short_id(entry_id: &str) -> &str {
        entry_id
            .rsplit_once("/abs/")
            .map(|(_, id)| id)
            .unwrap_or(entry_id)
            .trim_matches('/')
    }

    /// Parse arXiv Atom feed entry into a PreprintRecord
    fn parse_entry(entry: &feed_rs::model::Entry) -> PreprintRecord {
        let title = entry
            .title
            .as_ref()
            .map(|t| collapse_whitespace(&t.content))
            .unwrap_or_default();

        let authors = entry
            .authors
            .iter()
            .map(|a| a.name.trim().to_string())
            .collect();

        let summary = entry
            .summary
            .as_ref()
            .map(|s| s.content.trim().to_string())
            .unwrap_or_default();

        let pdf_url = entry
            .links
            .iter()
            .find(|l| {
                l.media_type.as_deref() == Some("application/pdf")
                    || l.title.as_deref() == Some("pdf")
            })
            .map(|l| l.href.clone())
            .unwrap_or_else(|| format!("{}/{}", ARXIV_PDF_URL, Self::short_id(&entry.id)));

        PreprintRecord {
            title,
            authors,
            published: entry.published.map(|d| d.to_rfc3339()),
            pdf_url,
            entry_id: entry.id.clone(),
            summary,
        }
    }

    /// arXiv reports malformed queries as a single feed entry under `/api/errors`
    fn api_error(feed: &feed_rs::model::Feed) -> Option<String> {
        feed.entries
            .iter()
            .find(|e| e.id.contains("/api/errors"))
            .map(|e| {
                e.summary
                    .as_ref()
                    .map(|s| s.content.trim().to_string())
                    .unwrap_or_else(|| "unspecified arXiv API error".to_string())
            })
    }
}

#[async_trait]
impl Source for ArxivSource {
    type Record = PreprintRecord;

    fn kind(&self) -> SourceKind {
        SourceKind::Arxiv
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<PreprintRecord>, SourceError> {
        validate_criteria(criteria)?;

        let url = self.build_url(criteria);
        tracing::debug!(url = %url, "Querying arXiv");

        let response = self
            .client
            .client()
            .get(&url)
            .header("Accept", "application/atom+xml")
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch arXiv results: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "arXiv API returned status: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        let feed = parser::parse(bytes.as_ref())
            .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))?;

        if let Some(message) = Self::api_error(&feed) {
            return Err(SourceError::Api(message));
        }

        let records: Vec<PreprintRecord> = feed
            .entries
            .iter()
            .take(criteria.max_results)
            .map(Self::parse_entry)
            .collect();

        tracing::info!(count = records.len(), "arXiv search complete");
        Ok(records)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>arXiv Query Results</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <updated>2024-01-02T00:00:00Z</updated>
    <published>2024-01-01T10:00:00Z</published>
    <title>Agentic RAG:
      A Survey</title>
    <summary>  We survey agentic retrieval.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2401.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2401.00001v1" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00002v2</id>
    <updated>2024-01-03T00:00:00Z</updated>
    <title>Evaluating RAG Pipelines</title>
    <summary>Evaluation.</summary>
    <author><name>Grace Hopper</name></author>
  </entry>
</feed>"#;

    fn source_for(server: &Server) -> ArxivSource {
        ArxivSource::with_client(
            HttpClient::new().unwrap(),
            format!("{}/api/query", server.url()),
        )
    }

    #[test]
    fn test_short_id() {
        assert_eq!(
            ArxivSource::short_id("http://arxiv.org/abs/2401.00001v1"),
            "2401.00001v1"
        );
        assert_eq!(ArxivSource::short_id("2401.00001"), "2401.00001");
    }

    #[test]
    fn test_build_url_caps_results() {
        let source = ArxivSource::with_client(HttpClient::new().unwrap(), ARXIV_API_URL);
        let url = source.build_url(&SearchCriteria::new("agentic RAG", 500));
        assert!(url.contains("search_query=agentic%20RAG"));
        assert!(url.contains("max_results=200"));
        assert!(url.contains("sortBy=relevance"));
    }

    #[tokio::test]
    async fn test_search_maps_entries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "agentic RAG evaluation".into()),
                Matcher::UrlEncoded("max_results".into(), "3".into()),
                Matcher::UrlEncoded("sortBy".into(), "relevance".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(FEED)
            .expect(1)
            .create_async()
            .await;

        let records = source_for(&server)
            .search_topic("agentic RAG evaluation", 3)
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.title, "Agentic RAG: A Survey");
        assert_eq!(first.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(first.pdf_url, "http://arxiv.org/pdf/2401.00001v1");
        assert_eq!(first.entry_id, "http://arxiv.org/abs/2401.00001v1");
        assert_eq!(first.summary, "We survey agentic retrieval.");
        assert!(first.published.as_deref().unwrap().starts_with("2024-01-01T10:00:00"));

        let second = &records[1];
        assert_eq!(second.title, "Evaluating RAG Pipelines");
        assert!(second.published.is_none());
        assert_eq!(second.pdf_url, "https://arxiv.org/pdf/2401.00002v2");
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = source_for(&server)
            .search_topic("rag", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Api(_)));
    }

    #[tokio::test]
    async fn test_search_api_error_entry() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>http://arxiv.org/api/query</id>
  <title>arXiv Query</title>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format</id>
    <title>Error</title>
    <summary>malformed query</summary>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#,
            )
            .create_async()
            .await;

        let err = source_for(&server)
            .search_topic("rag", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Api(ref m) if m == "malformed query"));
    }

    #[tokio::test]
    async fn test_search_rejects_empty_topic() {
        let source = ArxivSource::with_client(HttpClient::new().unwrap(), "http://127.0.0.1:9");
        assert!(matches!(
            source.search_topic("   ", 3).await,
            Err(SourceError::InvalidRequest(_))
        ));
    }
}
