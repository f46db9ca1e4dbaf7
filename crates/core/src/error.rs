//! Error types for the AutoContext domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; [`Error`] ties them together
//! for the two public operations.

use thiserror::Error;

/// The top-level error type for all AutoContext operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Caller input ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Embedding provider ---
    #[error("Embedding unavailable during {operation}: {source}")]
    EmbeddingUnavailable {
        operation: &'static str,
        retryable: bool,
        #[source]
        source: ProviderError,
    },

    // --- Entry store ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a provider failure observed while running `operation`.
    pub fn embedding_unavailable(operation: &'static str, source: ProviderError) -> Self {
        Self::EmbeddingUnavailable {
            operation,
            retryable: source.is_retryable(),
            source,
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmbeddingUnavailable { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Caller input was malformed. Always surfaced, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation}: field `{field}` {reason}")]
pub struct ValidationError {
    pub operation: &'static str,
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(operation: &'static str, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            operation,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Transient failures worth retrying: timeouts, network faults,
    /// rate limiting and server-side errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) | Self::RateLimited { .. } => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::MalformedResponse(_) | Self::NotConfigured(_) => {
                false
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("Store is full ({capacity} entries) and configured to reject new entries")]
    CapacityExceeded { capacity: usize },

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),
}
