//! Embedding provider implementations for AutoContext.
//!
//! All providers implement the `autocontext_core::EmbeddingProvider` trait.
//! `build_from_config` selects the backend and wraps it with timeout/retry.

pub mod hashing;
pub mod openai_compat;
pub mod resilient;
pub mod router;

pub use hashing::HashingEmbedder;
pub use openai_compat::OpenAiCompatEmbedder;
pub use resilient::ResilientEmbedder;
pub use router::build_from_config;
