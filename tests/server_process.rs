//! Integration tests for the `research-digest-server` binary
//!
//! These tests spawn the real server process and talk to it through
//! `StdioToolClient` over its stdin/stdout pipes.

use mockito::{Matcher, Server};
use research_digest::mcp::{unpack, ClientError, StdioToolClient, ToolClient, Unpacked};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

const SERVER_BIN: &str = env!("CARGO_BIN_EXE_research-digest-server");

/// Config file pointing the OpenAlex adapter at `base_url`
fn config_file(base_url: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".toml").unwrap();
    write!(
        file,
        r#"
[openalex]
base_url = "{}"
timeout_secs = 5
"#,
        base_url
    )
    .unwrap();
    file
}

async fn spawn_openalex(config: &NamedTempFile, extra: &[&str]) -> StdioToolClient {
    let mut args: Vec<String> = vec!["openalex".to_string()];
    args.extend(extra.iter().map(|s| s.to_string()));
    args.push("--config".to_string());
    args.push(config.path().to_string_lossy().into_owned());

    StdioToolClient::spawn("OpenAlex", SERVER_BIN, &args)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_server_lists_single_tool() {
    let config = config_file("http://127.0.0.1:9");
    let client = spawn_openalex(&config, &[]).await;

    let info = client.server_info().await.unwrap();
    assert_eq!(info.name, "openalex");

    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["openalex_search_works"]);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_mode_is_a_tool_error() {
    let config = config_file("http://127.0.0.1:9");
    let client = spawn_openalex(&config, &[]).await;

    let err = client
        .call_tool(
            "openalex_search_works",
            json!({"query": "rag", "per_page": 3, "mode": "fuzzy"}),
        )
        .await
        .unwrap_err();
    match err {
        ClientError::Tool(message) => assert!(message.contains("fuzzy"), "{message}"),
        other => panic!("expected a tool error, got {other:?}"),
    }

    // The session survives a failed call
    assert_eq!(client.list_tools().await.unwrap().len(), 1);
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_verbose_logging_keeps_stdout_clean() {
    let config = config_file("http://127.0.0.1:9");
    let client = spawn_openalex(&config, &["-vv"]).await;

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools[0].name, "openalex_search_works");

    // A failing upstream call logs warnings; the next frame must still parse
    let err = client
        .call_tool("openalex_search_works", json!({"query": "rag", "per_page": 1}))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Tool(_)));
    assert_eq!(client.list_tools().await.unwrap().len(), 1);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_search_through_server_process() {
    let mut upstream = Server::new_async().await;
    let works = upstream
        .mock("GET", "/works")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("search".into(), "rag".into()),
            Matcher::UrlEncoded("per-page".into(), "50".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"results": [
                {"id": "https://openalex.org/W1", "title": "RAG gene rearrangement in mice"},
                {"id": "https://openalex.org/W2", "title": "GraphRAG for enterprise search",
                 "doi": "https://doi.org/10.1/graph", "publication_year": 2024}
            ]})
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let config = config_file(&upstream.url());
    let client = spawn_openalex(&config, &[]).await;

    let raw = client
        .call_tool(
            "openalex_search_works",
            json!({"query": "rag", "per_page": 5, "mode": "ai"}),
        )
        .await
        .unwrap();
    works.assert_async().await;

    let Unpacked::Json(value) = unpack(raw) else {
        panic!("expected JSON records");
    };
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "GraphRAG for enterprise search");
    assert_eq!(records[0]["doi"], "10.1/graph");

    client.shutdown().await.unwrap();
}
