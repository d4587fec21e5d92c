//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::models::{SearchMode, SourceKind};
use crate::sources::{ArxivSource, OpenAlexSource, SourceError};
use crate::utils::RelevanceFilter;

/// arXiv search tool name
pub const ARXIV_SEARCH: &str = "arxiv_search";
/// OpenAlex works search tool name
pub const OPENALEX_SEARCH_WORKS: &str = "openalex_search_works";
/// Default result count for both tools
pub const DEFAULT_TOOL_RESULTS: u64 = 5;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "arxiv_search")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// Registry of the tools one server exposes
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry serving one source, built from configuration
    pub fn for_kind(kind: SourceKind, config: &Config) -> Result<Self, SourceError> {
        let mut registry = Self::new();
        match kind {
            SourceKind::Arxiv => {
                let source = ArxivSource::from_config(&config.arxiv)?;
                registry.register_arxiv(Arc::new(source));
            }
            SourceKind::OpenAlex => {
                let filter = RelevanceFilter::new(&config.relevance);
                let source = OpenAlexSource::from_config(&config.openalex, filter)?;
                registry.register_openalex(Arc::new(source));
            }
        }
        Ok(registry)
    }

    /// Register `arxiv_search`
    pub fn register_arxiv(&mut self, source: Arc<ArxivSource>) {
        self.register(Tool {
            name: ARXIV_SEARCH.to_string(),
            description: "Search arXiv by topic and return basic metadata.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "Search topic (arXiv query syntax is accepted)"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of preprints to return",
                        "default": DEFAULT_TOOL_RESULTS,
                        "minimum": 1
                    }
                },
                "required": ["topic"]
            }),
            handler: Arc::new(ArxivSearchHandler { source }),
        });
    }

    /// Register `openalex_search_works`
    pub fn register_openalex(&mut self, source: Arc<OpenAlexSource>) {
        self.register(Tool {
            name: OPENALEX_SEARCH_WORKS.to_string(),
            description: "Search OpenAlex works. mode \"ai\" keeps AI/RAG/LLM results only \
                          (precision); \"general\" applies no topical filter (recall)."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text search query"
                    },
                    "per_page": {
                        "type": "integer",
                        "description": "Maximum number of works to return",
                        "default": DEFAULT_TOOL_RESULTS,
                        "minimum": 1
                    },
                    "mode": {
                        "type": "string",
                        "description": "Filtering mode",
                        "enum": ["ai", "general"],
                        "default": "ai"
                    }
                },
                "required": ["query"]
            }),
            handler: Arc::new(OpenAlexSearchHandler { source }),
        });
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools, sorted by name
    pub fn all(&self) -> Vec<&Tool> {
        let mut tools: Vec<&Tool> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, String> {
        let tool = self
            .get(name)
            .ok_or_else(|| format!("Tool '{}' not found", name))?;

        tool.handler.execute(args).await
    }
}

/// Read a required string argument
fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing '{}' parameter", key))
}

/// Read an optional positive count, defaulting when absent or null
fn count_arg(args: &Value, key: &str) -> Result<usize, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(DEFAULT_TOOL_RESULTS as usize),
        Some(v) => v
            .as_u64()
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .ok_or_else(|| format!("'{}' must be a positive integer", key)),
    }
}

/// Handler for `arxiv_search`
#[derive(Debug)]
pub struct ArxivSearchHandler {
    pub source: Arc<ArxivSource>,
}

#[async_trait::async_trait]
impl ToolHandler for ArxivSearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let topic = required_str(&args, "topic")?;
        let max_results = count_arg(&args, "max_results")?;

        let records = self
            .source
            .search_topic(topic, max_results)
            .await
            .map_err(|e| format!("arXiv search failed: {}", e))?;

        serde_json::to_value(records).map_err(|e| e.to_string())
    }
}

/// Handler for `openalex_search_works`
#[derive(Debug)]
pub struct OpenAlexSearchHandler {
    pub source: Arc<OpenAlexSource>,
}

#[async_trait::async_trait]
impl ToolHandler for OpenAlexSearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let query = required_str(&args, "query")?;
        let per_page = count_arg(&args, "per_page")?;
        let mode = match args.get("mode").and_then(|v| v.as_str()) {
            Some(m) => m.parse::<SearchMode>().map_err(|e| e.to_string())?,
            None => SearchMode::default(),
        };

        let records = self
            .source
            .search_works(query, per_page, mode)
            .await
            .map_err(|e| format!("OpenAlex search failed: {}", e))?;

        serde_json::to_value(records).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::HttpClient;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn openalex_registry(base_url: &str) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        let source = OpenAlexSource::with_client(HttpClient::new().unwrap(), base_url);
        registry.register_openalex(Arc::new(source));
        registry
    }

    #[test]
    fn test_for_kind_registers_one_tool() {
        let config = Config::default();

        let arxiv = ToolRegistry::for_kind(SourceKind::Arxiv, &config).unwrap();
        let names: Vec<&str> = arxiv.all().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![ARXIV_SEARCH]);

        let openalex = ToolRegistry::for_kind(SourceKind::OpenAlex, &config).unwrap();
        let tool = openalex.get(OPENALEX_SEARCH_WORKS).unwrap();
        assert_eq!(tool.input_schema["properties"]["mode"]["default"], "ai");
        assert_eq!(tool.input_schema["properties"]["per_page"]["default"], 5);
        assert_eq!(tool.input_schema["required"], json!(["query"]));
    }

    #[test]
    fn test_count_arg() {
        assert_eq!(count_arg(&json!({}), "per_page"), Ok(5));
        assert_eq!(count_arg(&json!({"per_page": null}), "per_page"), Ok(5));
        assert_eq!(count_arg(&json!({"per_page": 3}), "per_page"), Ok(3));
        assert!(count_arg(&json!({"per_page": 0}), "per_page").is_err());
        assert!(count_arg(&json!({"per_page": "3"}), "per_page").is_err());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", json!({})).await.unwrap_err();
        assert_eq!(err, "Tool 'nope' not found");
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let registry = openalex_registry("http://127.0.0.1:9");
        let err = registry
            .execute(OPENALEX_SEARCH_WORKS, json!({"per_page": 3}))
            .await
            .unwrap_err();
        assert_eq!(err, "Missing 'query' parameter");
    }

    #[tokio::test]
    async fn test_invalid_mode_rejected() {
        let registry = openalex_registry("http://127.0.0.1:9");
        let err = registry
            .execute(OPENALEX_SEARCH_WORKS, json!({"query": "rag", "mode": "fuzzy"}))
            .await
            .unwrap_err();
        assert!(err.contains("fuzzy"));
    }

    #[tokio::test]
    async fn test_openalex_tool_defaults() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search".into(), "rag".into()),
                Matcher::UrlEncoded("per-page".into(), "50".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({"results": [
                    {"id": "https://openalex.org/W1", "title": "RAG gene rearrangement in mice"},
                    {"id": "https://openalex.org/W2", "title": "A RAG benchmark",
                     "doi": "https://doi.org/10.1/x", "publication_year": 2024}
                ]})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let registry = openalex_registry(&server.url());
        let value = registry
            .execute(OPENALEX_SEARCH_WORKS, json!({"query": "rag"}))
            .await
            .unwrap();
        mock.assert_async().await;

        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "A RAG benchmark");
        assert_eq!(items[0]["doi"], "10.1/x");
        assert_eq!(items[0]["openalex_url"], "https://openalex.org/W2");
    }

    #[tokio::test]
    async fn test_source_failure_becomes_tool_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let registry = openalex_registry(&server.url());
        let err = registry
            .execute(OPENALEX_SEARCH_WORKS, json!({"query": "rag", "per_page": 2}))
            .await
            .unwrap_err();
        assert!(err.starts_with("OpenAlex search failed"));
    }
}
