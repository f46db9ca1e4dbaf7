//! OpenAI-compatible embedding provider.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any endpoint
//! exposing an OpenAI-compatible `/v1/embeddings` route.

use async_trait::async_trait;
use autocontext_core::EmbeddingProvider;
use autocontext_core::error::ProviderError;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// An OpenAI-compatible embedding provider.
pub struct OpenAiCompatEmbedder {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    dimension: Option<usize>,
    client: reqwest::Client,
}

impl OpenAiCompatEmbedder {
    /// Create a new OpenAI-compatible embedder.
    ///
    /// `timeout` bounds the whole HTTP exchange; the resilient wrapper applies
    /// its own per-attempt timeout on top.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimension: None,
            client,
        })
    }

    /// Create an OpenAI embedder (convenience constructor).
    pub fn openai(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key, model, timeout)
    }

    /// Create an Ollama embedder (convenience constructor).
    pub fn ollama(
        base_url: Option<&str>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
            timeout,
        )
    }

    /// Declare the dimension the endpoint returns; responses are checked against it.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": [text],
            "encoding_format": "float",
        })
    }

    fn extract_vector(&self, api_resp: EmbeddingApiResponse) -> Result<Vec<f32>, ProviderError> {
        let data = api_resp
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .ok_or_else(|| ProviderError::MalformedResponse("Response contained no embeddings".into()))?;

        if data.embedding.is_empty() {
            return Err(ProviderError::MalformedResponse("Empty embedding vector".into()));
        }
        if let Some(expected) = self.dimension {
            if data.embedding.len() != expected {
                return Err(ProviderError::MalformedResponse(format!(
                    "Expected {expected}-dimensional embedding, got {}",
                    data.embedding.len()
                )));
            }
        }
        Ok(data.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);

        debug!(
            provider = %self.name,
            model = %self.model,
            chars = text.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse embedding response: {e}")))?;

        if let Some(usage) = &api_resp.usage {
            debug!(
                provider = %self.name,
                model = %api_resp.model,
                prompt_tokens = usage.prompt_tokens,
                "Embedding response received"
            );
        }

        self.extract_vector(api_resp)
    }
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: String,
    usage: Option<EmbeddingApiUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiUsage {
    prompt_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder() -> OpenAiCompatEmbedder {
        OpenAiCompatEmbedder::new(
            "test",
            "http://localhost:9/v1/",
            "sk-test",
            "text-embedding-3-small",
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        assert_eq!(embedder().base_url, "http://localhost:9/v1");
    }

    #[test]
    fn request_body_shape() {
        let body = embedder().request_body("hello world");
        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(body["input"][0], "hello world");
        assert_eq!(body["encoding_format"], "float");
    }

    #[test]
    fn parse_embedding_response() {
        let data = r#"{
            "data": [
                {"embedding": [0.4, 0.5, 0.6], "index": 1},
                {"embedding": [0.1, 0.2, 0.3], "index": 0}
            ],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 8, "total_tokens": 8}
        }"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.usage.as_ref().unwrap().prompt_tokens, 8);

        let vector = embedder().extract_vector(parsed).unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn empty_data_is_malformed() {
        let parsed: EmbeddingApiResponse =
            serde_json::from_str(r#"{"data": [], "model": "m"}"#).unwrap();
        let err = embedder().extract_vector(parsed).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn dimension_mismatch_is_malformed() {
        let parsed: EmbeddingApiResponse =
            serde_json::from_str(r#"{"data": [{"embedding": [0.1, 0.2], "index": 0}]}"#).unwrap();
        let err = embedder().with_dimension(3).extract_vector(parsed).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        // Port 9 (discard) is not listening in test environments.
        let err = embedder().embed("hello").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
