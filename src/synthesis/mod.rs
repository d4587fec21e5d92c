//! Answer synthesis with a local language model.
//!
//! [`synthesize`] never fails: any generation error becomes
//! [`SynthesisOutcome::Unavailable`], which renders as a fixed diagnostic.
//! [`audit_citations`] checks the answer's `[arXiv-i]` / `[OpenAlex-j]` tags
//! against the evidence that was actually supplied.

mod ollama;
mod prompt;

pub use ollama::OllamaLlm;
pub use prompt::{build_synthesis_prompt, NO_EVIDENCE_PHRASE};

use async_trait::async_trait;

use crate::models::SourceKind;

/// Text generation backend
#[async_trait]
pub trait Llm: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, SynthesisError>;
}

/// Generation failures
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Connection refused, DNS failure, timeout
    #[error("{0}")]
    Request(String),

    /// Non-2xx response
    #[error("{0}")]
    Status(String),

    #[error("invalid generate response: {0}")]
    Decode(String),
}

/// Result of the synthesis phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    Answer(String),
    Unavailable { model: String, details: String },
}

impl SynthesisOutcome {
    /// Text printed for this outcome
    pub fn render(&self) -> String {
        match self {
            SynthesisOutcome::Answer(answer) => answer.clone(),
            SynthesisOutcome::Unavailable { model, details } => format!(
                "[LLM ERROR] Could not reach the Ollama service.\n\
                 Make sure 'ollama serve' is running and the model is available (e.g. ollama pull {}).\n\
                 Details: {}",
                model, details
            ),
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            SynthesisOutcome::Answer(answer) => Some(answer),
            SynthesisOutcome::Unavailable { .. } => None,
        }
    }
}

/// Generate an answer, turning any failure into a diagnostic outcome
pub async fn synthesize(llm: &dyn Llm, model: &str, prompt: &str) -> SynthesisOutcome {
    match llm.generate(model, prompt).await {
        Ok(answer) => SynthesisOutcome::Answer(answer),
        Err(e) => {
            tracing::warn!(error = %e, model, "Generation failed");
            SynthesisOutcome::Unavailable {
                model: model.to_string(),
                details: e.to_string(),
            }
        }
    }
}

/// Inline citations found in an answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationAudit {
    /// Every well-formed tag, in order of appearance (duplicates kept)
    pub cited: Vec<String>,
    /// Tags whose position exceeds the supplied evidence
    pub out_of_range: Vec<String>,
}

impl CitationAudit {
    pub fn is_clean(&self) -> bool {
        self.out_of_range.is_empty()
    }

    /// Warning line for the output, if anything is wrong
    pub fn warning(&self, answer: &str) -> Option<String> {
        if !self.out_of_range.is_empty() {
            let mut tags: Vec<&str> = Vec::new();
            for tag in &self.out_of_range {
                if !tags.contains(&tag.as_str()) {
                    tags.push(tag);
                }
            }
            return Some(format!(
                "Warning: citations without matching evidence: {}",
                tags.join(", ")
            ));
        }
        if self.cited.is_empty() && !answer.contains(NO_EVIDENCE_PHRASE) {
            return Some("Warning: the answer carries no inline citations.".to_string());
        }
        None
    }
}

/// Find `[arXiv-i]` / `[OpenAlex-j]` tags and check each against the
/// number of records supplied for that source.
pub fn audit_citations(answer: &str, preprint_count: usize, index_count: usize) -> CitationAudit {
    let mut audit = CitationAudit::default();

    let mut rest = answer;
    while let Some(open) = rest.find('[') {
        rest = &rest[open + 1..];
        let Some(close) = rest.find(']') else {
            break;
        };
        let inner = &rest[..close];

        if let Some((kind, position)) = parse_tag(inner) {
            let available = match kind {
                SourceKind::Arxiv => preprint_count,
                SourceKind::OpenAlex => index_count,
            };
            let tag = kind.citation_tag(position);
            if position == 0 || position > available {
                audit.out_of_range.push(tag.clone());
            }
            audit.cited.push(tag);
            rest = &rest[close + 1..];
        }
    }

    audit
}

fn parse_tag(inner: &str) -> Option<(SourceKind, usize)> {
    let (prefix, number) = inner.split_once('-')?;
    let kind = [SourceKind::Arxiv, SourceKind::OpenAlex]
        .into_iter()
        .find(|k| k.name() == prefix)?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse().ok().map(|n| (kind, n))
}
