//! Human-readable rendering of unpacked evidence.

use serde_json::Value;
use std::fmt::Write;

use crate::mcp::Unpacked;

/// Section rule line
pub const RULE: &str = "==============================";
/// Printed in place of an empty list
pub const NO_RESULTS: &str = "(no results)";
/// Printed for a field that is absent or null
pub const MISSING: &str = "None";

/// Section header: blank line, rule, label, rule
pub fn section_header(label: &str) -> String {
    format!("\n{RULE}\n{label}\n{RULE}\n")
}

/// Render arXiv preprints: title and PDF link per record
pub fn render_preprints(label: &str, evidence: &Unpacked) -> String {
    render(label, evidence, |out, i, record| {
        let _ = writeln!(out, "{}. {}", i, field(record, "title"));
        let _ = writeln!(out, "   PDF: {}\n", field(record, "pdf_url"));
    })
}

/// Render OpenAlex works: title, year/citations, DOI/venue, OpenAlex link
pub fn render_index(label: &str, evidence: &Unpacked) -> String {
    render(label, evidence, |out, i, record| {
        let _ = writeln!(out, "{}. {}", i, field(record, "title"));
        let _ = writeln!(
            out,
            "   Year: {} | Cited by: {}",
            field(record, "publication_year"),
            field(record, "cited_by_count")
        );
        let _ = writeln!(
            out,
            "   DOI: {} | Source: {}",
            field(record, "doi"),
            field(record, "primary_location")
        );
        let _ = writeln!(out, "   OpenAlex: {}\n", field(record, "openalex_url"));
    })
}

fn render<F>(label: &str, evidence: &Unpacked, mut record_block: F) -> String
where
    F: FnMut(&mut String, usize, &Value),
{
    let mut out = section_header(label);

    match evidence {
        Unpacked::Text(text) => {
            out.push_str(text);
            out.push('\n');
        }
        Unpacked::Json(Value::Array(items)) if !items.is_empty() => {
            for (i, record) in items.iter().enumerate() {
                record_block(&mut out, i + 1, record);
            }
        }
        Unpacked::Json(Value::Object(map)) if !map.is_empty() => {
            record_block(&mut out, 1, &Value::Object(map.clone()));
        }
        Unpacked::Json(Value::Array(_)) | Unpacked::Json(Value::Object(_)) | Unpacked::Json(Value::Null) => {
            out.push_str(NO_RESULTS);
            out.push('\n');
        }
        Unpacked::Json(scalar) => {
            out.push_str(&scalar.to_string());
            out.push('\n');
        }
    }

    out
}

/// Display form of a record field
fn field(record: &Value, key: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_three_preprints_three_blocks() {
        let evidence = Unpacked::Json(json!([
            {"title": "A", "pdf_url": "https://arxiv.org/pdf/1"},
            {"title": "B", "pdf_url": "https://arxiv.org/pdf/2"},
            {"title": "C", "pdf_url": "https://arxiv.org/pdf/3"}
        ]));
        let out = render_preprints("arXiv RESULTS (preprints)", &evidence);

        assert!(out.starts_with("\n==============================\narXiv RESULTS (preprints)\n"));
        assert_eq!(out.matches("   PDF: ").count(), 3);
        assert!(out.contains("1. A\n   PDF: https://arxiv.org/pdf/1\n\n"));
        assert!(out.contains("3. C\n   PDF: https://arxiv.org/pdf/3\n\n"));
        assert!(!out.contains("4. "));
    }

    #[test]
    fn test_index_layout_and_missing_fields() {
        let evidence = Unpacked::Json(json!([{
            "title": "RAG survey",
            "publication_year": 2024,
            "cited_by_count": null,
            "doi": "10.1/x",
            "openalex_url": "https://openalex.org/W1"
        }]));
        let out = render_index("OpenAlex RESULTS", &evidence);
        assert!(out.contains(
            "1. RAG survey\n   Year: 2024 | Cited by: None\n   DOI: 10.1/x | Source: None\n   OpenAlex: https://openalex.org/W1\n"
        ));
    }

    #[test]
    fn test_empty_and_text() {
        assert!(render_preprints("L", &Unpacked::empty()).ends_with("(no results)\n"));
        assert!(render_index("L", &Unpacked::Json(Value::Null)).ends_with("(no results)\n"));
        assert!(render_index("L", &Unpacked::Json(json!({}))).ends_with("(no results)\n"));

        let out = render_index("L", &Unpacked::Text("[ERROR] OpenAlex search failed".into()));
        assert!(out.ends_with("==============================\n[ERROR] OpenAlex search failed\n"));
    }

    #[test]
    fn test_single_mapping_and_scalar() {
        let out = render_preprints("L", &Unpacked::Json(json!({"title": "Only"})));
        assert!(out.contains("1. Only\n   PDF: None\n"));

        let out = render_preprints("L", &Unpacked::Json(json!(42)));
        assert!(out.ends_with("==============================\n42\n"));
    }

    #[test]
    fn test_non_object_items_never_fail() {
        let out = render_preprints("L", &Unpacked::Json(json!(["loose string"])));
        assert!(out.contains("1. None\n   PDF: None\n"));
    }

    #[test]
    fn test_field_formats() {
        let record = json!({"s": "text", "n": 3, "list": ["a"]});
        assert_eq!(field(&record, "s"), "text");
        assert_eq!(field(&record, "n"), "3");
        assert_eq!(field(&record, "list"), "[\"a\"]");
        assert_eq!(field(&record, "absent"), "None");
    }
}
