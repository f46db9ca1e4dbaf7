//! Embedding provider trait, the abstraction over embedding backends.
//!
//! An embedding provider maps text to a fixed-dimension vector. It is the only
//! component that performs external I/O, so it is the only async seam in the
//! retrieval pipeline.
//!
//! Implementations: OpenAI-compatible HTTP endpoints, a deterministic hashing
//! embedder, and a timeout/retry wrapper around either.

use async_trait::async_trait;
use crate::error::ProviderError;

/// The core EmbeddingProvider trait.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "hashing").
    fn name(&self) -> &str;

    /// The vector dimension this provider produces, if known up front.
    fn dimension(&self) -> Option<usize> {
        None
    }

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;
}
