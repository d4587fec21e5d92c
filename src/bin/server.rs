use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use research_digest::config::load_config;
use research_digest::mcp::McpServer;
use research_digest::models::SourceKind;
use research_digest::utils::init_tracing;
use std::path::PathBuf;

/// MCP tool server for one research source, speaking JSON-RPC over stdio
#[derive(Parser, Debug)]
#[command(name = "research-digest-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve the arXiv or OpenAlex search tool over MCP stdio", long_about = None)]
struct Cli {
    /// Source to serve
    #[arg(value_enum)]
    source: ServedSource,

    /// Enable verbose logging (stderr)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error log output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ServedSource {
    #[value(name = "arxiv")]
    Arxiv,
    #[value(name = "openalex")]
    OpenAlex,
}

impl From<ServedSource> for SourceKind {
    fn from(source: ServedSource) -> Self {
        match source {
            ServedSource::Arxiv => SourceKind::Arxiv,
            ServedSource::OpenAlex => SourceKind::OpenAlex,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let kind = SourceKind::from(cli.source);

    let server = McpServer::new(kind, &config)
        .map_err(|e| anyhow::anyhow!("Failed to create {} server: {}", kind, e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {}", e))?;

    tracing::info!(source = %kind, "MCP server stopped");
    Ok(())
}
