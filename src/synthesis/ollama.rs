use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Llm, SynthesisError};
use crate::config::SynthesisConfig;

/// Ollama `/api/generate` client (non-streaming)
#[derive(Debug, Clone)]
pub struct OllamaLlm {
    client: reqwest::Client,
    endpoint: String,
}

impl OllamaLlm {
    /// `endpoint` is the full generate URL; `timeout` bounds the whole request
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SynthesisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SynthesisError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &SynthesisConfig) -> Result<Self, SynthesisError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl Llm for OllamaLlm {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, SynthesisError> {
        let req = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        tracing::debug!(endpoint = %self.endpoint, model, "Requesting generation");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&req)
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| SynthesisError::Status(e.to_string()))?;

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn llm_for(server: &Server) -> OllamaLlm {
        OllamaLlm::new(
            format!("{}/api/generate", server.url()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_posts_non_streaming_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::Json(json!({
                "model": "llama3.2",
                "prompt": "hello",
                "stream": false
            })))
            .with_status(200)
            .with_body(r#"{"model":"llama3.2","response":"  Grounded answer [arXiv-1].\n","done":true}"#)
            .expect(1)
            .create_async()
            .await;

        let answer = llm_for(&server).generate("llama3.2", "hello").await.unwrap();
        mock.assert_async().await;
        assert_eq!(answer, "Grounded answer [arXiv-1].");
    }

    #[tokio::test]
    async fn test_generate_http_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(500)
            .with_body("model not found")
            .create_async()
            .await;

        let err = llm_for(&server).generate("missing", "hello").await.unwrap_err();
        assert!(matches!(err, SynthesisError::Status(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_generate_bad_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = llm_for(&server).generate("m", "p").await.unwrap_err();
        assert!(matches!(err, SynthesisError::Decode(_)));
    }

    #[tokio::test]
    async fn test_generate_unreachable() {
        let llm = OllamaLlm::new("http://127.0.0.1:9/api/generate", Duration::from_secs(2)).unwrap();
        let err = llm.generate("m", "p").await.unwrap_err();
        assert!(matches!(err, SynthesisError::Request(_)));
    }
}
