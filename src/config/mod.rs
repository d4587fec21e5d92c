//! Configuration management.
//!
//! Settings come from an optional TOML file plus environment overrides
//! (`RESEARCH_DIGEST_<SECTION>__<KEY>`, e.g. `RESEARCH_DIGEST_SYNTHESIS__MODEL`).
//! Every field has a default, so running without any file works.
//!
//! ```toml
//! [servers.arxiv]
//! command = "/usr/local/bin/research-digest-server"
//! args = ["arxiv"]
//!
//! [openalex]
//! email = "me@example.org"
//!
//! [synthesis]
//! model = "llama3.2"
//! timeout_secs = 120
//!
//! [relevance]
//! acronym = "rag"
//! bio_noise = ["mice", "gene", "immun"]
//! match = "substring"  # or "word"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::SourceKind;
use crate::sources::{ARXIV_API_URL, OPENALEX_API_BASE};
use crate::utils::{RelevanceLexicon, DEFAULT_TIMEOUT_SECS};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "RESEARCH_DIGEST";
/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "research-digest.toml";
/// Tool server binary name
pub const SERVER_BINARY: &str = "research-digest-server";
/// Default text generation endpoint
pub const DEFAULT_GENERATE_URL: &str = "http://localhost:11434/api/generate";
/// Default generation model
pub const DEFAULT_MODEL: &str = "llama3.2";
/// Default generation deadline in seconds
pub const DEFAULT_SYNTHESIS_TIMEOUT_SECS: u64 = 120;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// How to launch the tool servers
    #[serde(default)]
    pub servers: ServersConfig,

    /// arXiv adapter settings
    #[serde(default)]
    pub arxiv: ArxivConfig,

    /// OpenAlex adapter settings
    #[serde(default)]
    pub openalex: OpenAlexConfig,

    /// Text generation settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Relevance filter lexicons
    #[serde(default)]
    pub relevance: RelevanceLexicon,
}

/// Commands used to spawn the two tool servers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersConfig {
    #[serde(default = "default_arxiv_server")]
    pub arxiv: ServerCommand,

    #[serde(default = "default_openalex_server")]
    pub openalex: ServerCommand,
}

impl Default for ServersConfig {
    fn default() -> Self {
        Self {
            arxiv: default_arxiv_server(),
            openalex: default_openalex_server(),
        }
    }
}

impl ServersConfig {
    pub fn for_kind(&self, kind: SourceKind) -> &ServerCommand {
        match kind {
            SourceKind::Arxiv => &self.arxiv,
            SourceKind::OpenAlex => &self.openalex,
        }
    }
}

/// A child process command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCommand {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl ServerCommand {
    /// The bundled server binary, serving one source
    pub fn bundled(kind: SourceKind) -> Self {
        Self {
            command: bundled_server_path().to_string_lossy().into_owned(),
            args: vec![kind.id().to_string()],
        }
    }
}

/// `research-digest-server` next to the running executable, else on `PATH`
fn bundled_server_path() -> PathBuf {
    let name = format!("{}{}", SERVER_BINARY, std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(name))
}

fn default_arxiv_server() -> ServerCommand {
    ServerCommand::bundled(SourceKind::Arxiv)
}

fn default_openalex_server() -> ServerCommand {
    ServerCommand::bundled(SourceKind::OpenAlex)
}

/// arXiv adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivConfig {
    #[serde(default = "default_arxiv_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: default_arxiv_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_arxiv_url() -> String {
    ARXIV_API_URL.to_string()
}

/// OpenAlex adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAlexConfig {
    #[serde(default = "default_openalex_url")]
    pub base_url: String,

    /// Contact address for the polite pool (falls back to `OPENALEX_EMAIL`)
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: default_openalex_url(),
            email: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_openalex_url() -> String {
    OPENALEX_API_BASE.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Text generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_synthesis_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_GENERATE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_synthesis_timeout() -> u64 {
    DEFAULT_SYNTHESIS_TIMEOUT_SECS
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Locate the config file.
///
/// An explicit path always wins (and must exist). Otherwise
/// `./research-digest.toml`, then `<config_dir>/research-digest/config.toml`.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("research-digest").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = find_config_file(path) {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path));
        }
        tracing::debug!(path = %path.display(), "Loading config file");
        builder = builder.add_source(config::File::from(path.as_path()));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    if config.openalex.email.is_none() {
        config.openalex.email = std::env::var("OPENALEX_EMAIL").ok().filter(|e| !e.is_empty());
    }
    Ok(config)
}
