use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use research_digest::config::{load_config, Config, ServerCommand};
use research_digest::digest::{Digest, DigestRequest};
use research_digest::mcp::{LocalToolClient, StdioToolClient, ToolClient, ToolRegistry};
use research_digest::models::{SearchMode, SourceKind};
use research_digest::synthesis::{Llm, OllamaLlm};
use research_digest::utils::init_tracing;
use std::path::{Path, PathBuf};

/// Research Digest - search arXiv and OpenAlex, optionally synthesize a cited answer
#[derive(Parser, Debug)]
#[command(name = "research-digest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search arXiv and OpenAlex and optionally synthesize a cited answer with a local LLM", long_about = None)]
struct Cli {
    /// Research question, e.g. "agentic RAG evaluation"
    question: String,

    /// Results per source
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    k: u64,

    /// Generate a final answer with a local LLM (Ollama)
    #[arg(long)]
    llm: bool,

    /// Ollama model (defaults to the configured model, llama3.2)
    #[arg(long)]
    model: Option<String>,

    /// OpenAlex filtering mode
    #[arg(long, value_enum, default_value_t = Mode::Ai)]
    mode: Mode,

    /// Serve both tools in-process instead of spawning tool servers
    #[arg(long)]
    in_process: bool,

    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error log output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,
}

/// OpenAlex filtering mode
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Keep AI/RAG/LLM results only (precision)
    Ai,
    /// No topical filter (recall)
    General,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Ai => SearchMode::Precision,
            Mode::General => SearchMode::Recall,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    let request = DigestRequest::new(cli.question.clone(), cli.k as usize)
        .mode(cli.mode.into())
        .model(
            cli.model
                .clone()
                .unwrap_or_else(|| config.synthesis.model.clone()),
        );

    let llm = if cli.llm {
        Some(OllamaLlm::from_config(&config.synthesis).context("Failed to set up the LLM client")?)
    } else {
        None
    };
    let llm = llm.as_ref().map(|l| l as &dyn Llm);

    if cli.in_process {
        let arxiv = LocalToolClient::new(
            ToolRegistry::for_kind(SourceKind::Arxiv, &config).context("Failed to set up arXiv")?,
        );
        let openalex = LocalToolClient::new(
            ToolRegistry::for_kind(SourceKind::OpenAlex, &config)
                .context("Failed to set up OpenAlex")?,
        );
        return run_digest(&arxiv, &openalex, llm, &request).await;
    }

    let (arxiv, openalex) = tokio::try_join!(
        spawn_server(SourceKind::Arxiv, &config, cli.config.as_deref()),
        spawn_server(SourceKind::OpenAlex, &config, cli.config.as_deref()),
    )?;

    let result = run_digest(&arxiv, &openalex, llm, &request).await;

    for client in [&arxiv, &openalex] {
        if let Err(e) = client.shutdown().await {
            tracing::warn!(server = client.label(), error = %e, "Tool server shutdown failed");
        }
    }

    result
}

async fn run_digest(
    arxiv: &dyn ToolClient,
    openalex: &dyn ToolClient,
    llm: Option<&dyn Llm>,
    request: &DigestRequest,
) -> Result<()> {
    let mut digest = Digest::new(arxiv, openalex);
    if let Some(llm) = llm {
        digest = digest.with_llm(llm);
    }

    let mut stdout = std::io::stdout();
    digest.run(request, &mut stdout).await?;
    Ok(())
}

/// Spawn the configured tool server for `kind` and complete the handshake
async fn spawn_server(
    kind: SourceKind,
    config: &Config,
    config_path: Option<&Path>,
) -> Result<StdioToolClient> {
    let command = server_command(kind, config, config_path);
    StdioToolClient::spawn(kind.name(), &command.command, &command.args)
        .await
        .with_context(|| format!("Failed to start the {} tool server ({})", kind, command.command))
}

/// The bundled server is told about an explicit `--config` file too
fn server_command(kind: SourceKind, config: &Config, config_path: Option<&Path>) -> ServerCommand {
    let mut command = config.servers.for_kind(kind).clone();
    if let Some(path) = config_path {
        if command == ServerCommand::bundled(kind) {
            command.args.push("--config".to_string());
            command.args.push(path.to_string_lossy().into_owned());
        }
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["research-digest", "agentic RAG evaluation"]);
        assert_eq!(cli.question, "agentic RAG evaluation");
        assert_eq!(cli.k, 3);
        assert!(!cli.llm);
        assert!(cli.model.is_none());
        assert_eq!(cli.mode, Mode::Ai);
        assert!(!cli.in_process);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_llm_flags() {
        let cli = Cli::parse_from(["research-digest", "q", "--llm", "--model", "mistral", "--k", "5"]);
        assert!(cli.llm);
        assert_eq!(cli.model.as_deref(), Some("mistral"));
        assert_eq!(cli.k, 5);
    }

    #[test]
    fn test_cli_mode() {
        let cli = Cli::parse_from(["research-digest", "q", "--mode", "general"]);
        assert_eq!(SearchMode::from(cli.mode), SearchMode::Recall);
        assert!(Cli::try_parse_from(["research-digest", "q", "--mode", "fuzzy"]).is_err());
    }

    #[test]
    fn test_cli_rejects_zero_k_and_missing_question() {
        assert!(Cli::try_parse_from(["research-digest", "q", "--k", "0"]).is_err());
        assert!(Cli::try_parse_from(["research-digest"]).is_err());
    }

    #[test]
    fn test_cli_verbose_and_quiet() {
        let cli = Cli::parse_from(["research-digest", "q", "-vv", "-q"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.quiet);
    }

    #[test]
    fn test_server_command_forwards_config_to_bundled_server() {
        let config = Config::default();
        let path = Path::new("/etc/research-digest.toml");

        let command = server_command(SourceKind::OpenAlex, &config, Some(path));
        assert_eq!(
            command.args,
            vec!["openalex", "--config", "/etc/research-digest.toml"]
        );

        let command = server_command(SourceKind::Arxiv, &config, None);
        assert_eq!(command.args, vec!["arxiv"]);
    }

    #[test]
    fn test_server_command_leaves_custom_servers_alone() {
        let mut config = Config::default();
        config.servers.arxiv = ServerCommand {
            command: "python".to_string(),
            args: vec!["servers/arxiv_server.py".to_string()],
        };
        let command = server_command(SourceKind::Arxiv, &config, Some(Path::new("x.toml")));
        assert_eq!(command.args, vec!["servers/arxiv_server.py"]);
    }
}
