//! One digest run: discover, search both sources, present, synthesize.
//!
//! Both searches are issued concurrently and joined before anything is
//! presented. A source that fails is shown as a labeled diagnostic and
//! contributes an empty list to the prompt; only when both fail does the run
//! end with an error (after printing both diagnostics).

mod present;

pub use present::{render_index, render_preprints, section_header, MISSING, NO_RESULTS, RULE};

use serde_json::json;
use std::io::Write;
use tracing::{debug, info, warn};

use crate::mcp::{unpack, ClientError, ToolClient, Unpacked, ARXIV_SEARCH, OPENALEX_SEARCH_WORKS};
use crate::models::{SearchMode, SourceKind};
use crate::synthesis::{audit_citations, build_synthesis_prompt, synthesize, Llm, SynthesisOutcome};

/// Section label for arXiv results
pub const ARXIV_LABEL: &str = "arXiv RESULTS (preprints)";
/// Section label for OpenAlex results
pub const OPENALEX_LABEL: &str = "OpenAlex RESULTS (overview + citations)";
/// Section label for the generated answer
pub const ANSWER_LABEL: &str = "ANSWER (LLM)";

/// Closing text when no synthesis is requested
pub const NO_LLM_SUMMARY: &str = "=== Summary (no LLM) ===\n\
- arXiv: very recent preprints, abstract + PDF.\n\
- OpenAlex: broader coverage + signals such as citations/year.\n\
Next step: use a (local) LLM in the client to merge the results into a single answer.";

/// Parameters of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestRequest {
    pub question: String,
    /// Results per source
    pub k: usize,
    /// OpenAlex filtering mode
    pub mode: SearchMode,
    /// Generation model (used only with an LLM attached)
    pub model: String,
}

impl DigestRequest {
    pub fn new(question: impl Into<String>, k: usize) -> Self {
        Self {
            question: question.into(),
            k,
            mode: SearchMode::default(),
            model: crate::config::DEFAULT_MODEL.to_string(),
        }
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Digest run errors
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("both sources failed (arXiv: {arxiv}; OpenAlex: {openalex})")]
    AllSourcesFailed { arxiv: String, openalex: String },
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct DigestReport {
    pub preprints: Unpacked,
    pub index: Unpacked,
    /// Labeled diagnostics of failed sources
    pub failures: Vec<String>,
    /// `None` when no LLM was attached
    pub synthesis: Option<SynthesisOutcome>,
}

/// Evidence of one source after its call completed
struct SourceResult {
    /// What the presenter shows
    shown: Unpacked,
    /// What the prompt receives
    evidence: Unpacked,
    failure: Option<String>,
}

impl SourceResult {
    fn from_call(kind: SourceKind, result: Result<crate::mcp::RawToolResult, ClientError>) -> Self {
        match result {
            Ok(raw) => {
                let unpacked = unpack(raw);
                debug!(source = %kind, records = unpacked.record_count(), "Unpacked tool result");
                Self {
                    shown: unpacked.clone(),
                    evidence: unpacked,
                    failure: None,
                }
            }
            Err(e) => {
                warn!(source = %kind, error = %e, "Search failed");
                let diagnostic = format!("[ERROR] {} search failed: {}", kind, e);
                Self {
                    shown: Unpacked::Text(diagnostic.clone()),
                    evidence: Unpacked::empty(),
                    failure: Some(diagnostic),
                }
            }
        }
    }
}

/// The digest pipeline over two tool clients and an optional LLM
pub struct Digest<'a> {
    arxiv: &'a dyn ToolClient,
    openalex: &'a dyn ToolClient,
    llm: Option<&'a dyn Llm>,
}

impl<'a> Digest<'a> {
    pub fn new(arxiv: &'a dyn ToolClient, openalex: &'a dyn ToolClient) -> Self {
        Self {
            arxiv,
            openalex,
            llm: None,
        }
    }

    /// Attach a generation backend (enables the synthesis phase)
    pub fn with_llm(mut self, llm: &'a dyn Llm) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Run the whole pipeline, writing plain text to `out`
    pub async fn run<W: Write>(
        &self,
        request: &DigestRequest,
        out: &mut W,
    ) -> Result<DigestReport, DigestError> {
        self.print_tools(out).await?;

        info!(question = %request.question, k = request.k, mode = %request.mode, "Searching sources");
        let (arxiv, openalex) = tokio::join!(
            self.arxiv.call_tool(
                ARXIV_SEARCH,
                json!({"topic": request.question, "max_results": request.k}),
            ),
            self.openalex.call_tool(
                OPENALEX_SEARCH_WORKS,
                json!({
                    "query": request.question,
                    "per_page": request.k,
                    "mode": request.mode.as_str()
                }),
            ),
        );
        let arxiv = SourceResult::from_call(SourceKind::Arxiv, arxiv);
        let openalex = SourceResult::from_call(SourceKind::OpenAlex, openalex);

        out.write_all(render_preprints(ARXIV_LABEL, &arxiv.shown).as_bytes())?;
        out.write_all(render_index(OPENALEX_LABEL, &openalex.shown).as_bytes())?;
        out.flush()?;

        if let (Some(a), Some(o)) = (&arxiv.failure, &openalex.failure) {
            return Err(DigestError::AllSourcesFailed {
                arxiv: a.clone(),
                openalex: o.clone(),
            });
        }

        let failures: Vec<String> = [arxiv.failure, openalex.failure]
            .into_iter()
            .flatten()
            .collect();

        let synthesis = match self.llm {
            None => {
                writeln!(out, "\n{}", NO_LLM_SUMMARY)?;
                None
            }
            Some(llm) => {
                let outcome = self
                    .synthesize(llm, request, &arxiv.evidence, &openalex.evidence, out)
                    .await?;
                Some(outcome)
            }
        };

        Ok(DigestReport {
            preprints: arxiv.evidence,
            index: openalex.evidence,
            failures,
            synthesis,
        })
    }

    /// Print each server's tool names; listing failures are shown, not fatal
    async fn print_tools<W: Write>(&self, out: &mut W) -> Result<(), DigestError> {
        let (arxiv, openalex) = tokio::join!(self.arxiv.list_tools(), self.openalex.list_tools());

        for (kind, listing) in [(SourceKind::Arxiv, arxiv), (SourceKind::OpenAlex, openalex)] {
            writeln!(out, "\n== Tools {} ==", kind)?;
            match listing {
                Ok(tools) => {
                    for tool in tools {
                        writeln!(out, "- {}", tool.name)?;
                    }
                }
                Err(e) => writeln!(out, "[ERROR] {} tool listing failed: {}", kind, e)?,
            }
        }
        Ok(())
    }

    async fn synthesize<W: Write>(
        &self,
        llm: &dyn Llm,
        request: &DigestRequest,
        preprints: &Unpacked,
        index: &Unpacked,
        out: &mut W,
    ) -> Result<SynthesisOutcome, DigestError> {
        let prompt = build_synthesis_prompt(&request.question, preprints, index);
        debug!(chars = prompt.len(), model = %request.model, "Built synthesis prompt");

        let outcome = synthesize(llm, &request.model, &prompt).await;
        match outcome.answer() {
            None => writeln!(out, "\n{}", outcome.render())?,
            Some(answer) => {
                out.write_all(section_header(ANSWER_LABEL).as_bytes())?;
                writeln!(out, "{}", answer)?;

                let audit = audit_citations(answer, preprints.record_count(), index.record_count());
                if let Some(warning) = audit.warning(answer) {
                    writeln!(out, "\n{}", warning)?;
                }
            }
        }
        Ok(outcome)
    }
}
