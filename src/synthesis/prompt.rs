//! Grounded synthesis prompt.

use crate::mcp::Unpacked;
use crate::models::SourceKind;

/// Sentence the model must use for claims the evidence does not support
pub const NO_EVIDENCE_PHRASE: &str = "No supporting evidence was found in the provided sources.";

/// Build the synthesis prompt for `question` over both evidence lists.
///
/// Pure and deterministic: the same inputs always produce the same text.
pub fn build_synthesis_prompt(question: &str, preprints: &Unpacked, index: &Unpacked) -> String {
    let arxiv = SourceKind::Arxiv.name();
    let openalex = SourceKind::OpenAlex.name();
    let preprints_json = evidence_json(preprints);
    let index_json = evidence_json(index);

    format!(
        r#"You are a scientific research assistant.

Rules (non-negotiable):
1) Use ONLY the information contained in the SOURCES provided below.
2) EVERY factual statement MUST carry an inline citation in the form [{arxiv}-1], [{arxiv}-2], [{openalex}-1], etc. Numbers are 1-based positions in the lists below.
3) If a statement is NOT supported by the sources, write explicitly:
   "{NO_EVIDENCE_PHRASE}"
4) Do not use general knowledge or outside memory.

QUESTION:
{question}

{arxiv} RESULTS (list, in order):
{preprints_json}

{openalex} RESULTS (list, in order):
{index_json}

REQUIRED OUTPUT:
- One synthesis paragraph with MANDATORY inline citations
- A final "Sources" section listing:
  * [{arxiv}-i] title + PDF link
  * [{openalex}-j] title + DOI or OpenAlex link
"#
    )
}

/// Two-space indented JSON, non-ASCII kept as-is
fn evidence_json(evidence: &Unpacked) -> String {
    let value = evidence.to_json();
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> (Unpacked, Unpacked) {
        (
            Unpacked::Json(json!([{"title": "Agentic RAG", "pdf_url": "https://arxiv.org/pdf/1"}])),
            Unpacked::Json(json!([{"title": "Évaluation de RAG", "doi": "10.1/x"}])),
        )
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let (a, o) = sample();
        assert_eq!(
            build_synthesis_prompt("agentic RAG evaluation", &a, &o),
            build_synthesis_prompt("agentic RAG evaluation", &a, &o)
        );
    }

    #[test]
    fn test_prompt_contents() {
        let (a, o) = sample();
        let prompt = build_synthesis_prompt("agentic RAG evaluation", &a, &o);

        assert!(prompt.contains("QUESTION:\nagentic RAG evaluation\n"));
        assert!(prompt.contains("[arXiv-1], [arXiv-2], [OpenAlex-1]"));
        assert!(prompt.contains(NO_EVIDENCE_PHRASE));
        assert!(prompt.contains("\"Sources\""));
        // Pretty-printed with two-space indent, non-ASCII preserved
        assert!(prompt.contains("(list, in order):\n[\n  {\n    \""));
        assert!(prompt.contains("\n    \"title\": \"Agentic RAG\""));
        assert!(prompt.contains("Évaluation de RAG"));
    }

    #[test]
    fn test_prompt_orders_sources() {
        let (a, o) = sample();
        let prompt = build_synthesis_prompt("q", &a, &o);
        let arxiv_at = prompt.find("arXiv RESULTS").unwrap();
        let openalex_at = prompt.find("OpenAlex RESULTS").unwrap();
        assert!(arxiv_at < openalex_at);
    }

    #[test]
    fn test_prompt_with_empty_and_text_evidence() {
        let prompt = build_synthesis_prompt(
            "q",
            &Unpacked::empty(),
            &Unpacked::Text("rate limited".to_string()),
        );
        assert!(prompt.contains("arXiv RESULTS (list, in order):\n[]\n"));
        assert!(prompt.contains("OpenAlex RESULTS (list, in order):\n\"rate limited\"\n"));
    }
}
