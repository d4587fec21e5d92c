//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! One server process serves one source. Stdout carries JSON-RPC frames
//! only, so all logging must go to stderr.

use crate::config::Config;
use crate::mcp::tools::ToolRegistry;
use crate::models::SourceKind;
use async_trait::async_trait;
use pmcp::{Error, RequestHandlerExtra, Server, ServerCapabilities, ToolHandler, ToolInfo};
use serde_json::Value;
use std::sync::Arc;

/// The MCP server for one research source
pub struct McpServer {
    kind: SourceKind,
    server: Server,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer").field("kind", &self.kind).finish()
    }
}

impl McpServer {
    /// Create a server exposing the tools of `kind`
    pub fn new(kind: SourceKind, config: &Config) -> Result<Self, Error> {
        let tools = ToolRegistry::for_kind(kind, config)
            .map_err(|e| Error::internal(format!("Failed to build {} source: {}", kind, e)))?;
        Self::from_registry(kind, tools)
    }

    /// Create a server over an existing registry
    pub fn from_registry(kind: SourceKind, tools: ToolRegistry) -> Result<Self, Error> {
        let server = Self::build_server_impl(kind, &tools)?;
        Ok(Self { kind, server })
    }

    /// Build the MCP server with tool handlers (internal implementation)
    fn build_server_impl(kind: SourceKind, tools: &ToolRegistry) -> Result<Server, Error> {
        let mut builder = Server::builder()
            .name(kind.id())
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for tool in tools.all() {
            let tool_handler = ToolWrapper {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema.clone(),
                handler: tool.handler.clone(),
            };
            builder = builder.tool(tool_handler.name.clone(), tool_handler);
        }

        builder.build()
    }

    /// Which source this server exposes
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Run the server over stdin/stdout until the client disconnects
    pub async fn run(self) -> Result<(), Error> {
        tracing::info!(source = %self.kind, "Starting MCP server in stdio mode");
        self.server.run_stdio().await
    }
}

/// Wrapper for adapting our Tool to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<dyn crate::mcp::tools::ToolHandler>,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        tracing::debug!(tool = %self.name, "Tool call");
        self.handler.execute(args).await.map_err(|e| {
            tracing::warn!(tool = %self.name, error = %e, "Tool call failed");
            Error::internal(&e)
        })
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_builds_for_each_source() {
        let config = Config::default();
        for kind in [SourceKind::Arxiv, SourceKind::OpenAlex] {
            let server = McpServer::new(kind, &config).unwrap();
            assert_eq!(server.kind(), kind);
        }
    }

    #[test]
    fn test_wrapper_metadata() {
        let tools = ToolRegistry::for_kind(SourceKind::Arxiv, &Config::default()).unwrap();
        let tool = tools.all()[0];
        let wrapper = ToolWrapper {
            name: tool.name.clone(),
            description: Some(tool.description.clone()),
            input_schema: tool.input_schema.clone(),
            handler: tool.handler.clone(),
        };
        let info = wrapper.metadata().unwrap();
        assert_eq!(info.name, "arxiv_search");
        assert_eq!(info.input_schema["required"][0], "topic");
    }
}
