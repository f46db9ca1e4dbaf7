//! Provider construction: selects the embedding backend from config.

use crate::hashing::{DEFAULT_HASHING_DIMENSION, HashingEmbedder};
use crate::openai_compat::OpenAiCompatEmbedder;
use crate::resilient::ResilientEmbedder;
use autocontext_config::EmbeddingConfig;
use autocontext_core::EmbeddingProvider;
use autocontext_core::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the configured embedding provider, wrapped with timeout and retry.
pub fn build_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let base: Arc<dyn EmbeddingProvider> = match config.provider.as_str() {
        "hashing" => Arc::new(HashingEmbedder::new(
            config.dimension.unwrap_or(DEFAULT_HASHING_DIMENSION),
        )),
        "openai" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ProviderError::NotConfigured(
                    "openai embeddings need an API key (embedding.api_key or AUTOCONTEXT_API_KEY)"
                        .into(),
                )
            })?;
            let embedder = match &config.base_url {
                Some(url) => OpenAiCompatEmbedder::new("openai", url, api_key, &config.model, timeout)?,
                None => OpenAiCompatEmbedder::openai(api_key, &config.model, timeout)?,
            };
            Arc::new(with_dimension(embedder, config.dimension))
        }
        "ollama" => {
            let embedder =
                OpenAiCompatEmbedder::ollama(config.base_url.as_deref(), &config.model, timeout)?;
            Arc::new(with_dimension(embedder, config.dimension))
        }
        "custom" => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                ProviderError::NotConfigured("custom embeddings need embedding.base_url".into())
            })?;
            let api_key = config.api_key.clone().unwrap_or_default();
            let embedder =
                OpenAiCompatEmbedder::new("custom", base_url, api_key, &config.model, timeout)?;
            Arc::new(with_dimension(embedder, config.dimension))
        }
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "Unknown embedding provider '{other}'"
            )));
        }
    };

    info!(
        provider = %base.name(),
        model = %config.model,
        timeout_secs = config.timeout_secs,
        max_retries = config.max_retries,
        "Embedding provider ready"
    );

    Ok(Arc::new(
        ResilientEmbedder::new(base)
            .with_timeout(timeout)
            .with_max_retries(config.max_retries)
            .with_backoff(Duration::from_millis(config.backoff_ms)),
    ))
}

fn with_dimension(embedder: OpenAiCompatEmbedder, dimension: Option<usize>) -> OpenAiCompatEmbedder {
    match dimension {
        Some(d) => embedder.with_dimension(d),
        None => embedder,
    }
}
