//! Entries: the stored unit of knowledge.
//!
//! An entry's identity is the SHA-256 digest of its text, so re-submitting the
//! same text always resolves to the same id.

use crate::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Content-derived entry identifier (lowercase hex SHA-256 of the text).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Derive the id for a piece of text.
    pub fn for_text(text: &str) -> Self {
        Self(content_hash(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines and rendered attribution.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Hex SHA-256 of `text`, used both as identity and as the dedup key.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// A stored entry.
///
/// Text and embedding are reference-counted so the store can hand out copies
/// without duplicating the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Content hash of `text`
    pub id: EntryId,

    /// The raw source text
    pub text: Arc<str>,

    /// Embedding vector, dimension fixed by the store
    pub embedding: Arc<[f32]>,

    /// Scalar metadata (source, tags, timestamps)
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,

    /// When this entry was created
    pub created_at: DateTime<Utc>,

    /// When this entry was last included in a retrieval result
    pub last_accessed_at: DateTime<Utc>,

    /// Size of `text` under the configured token counter
    pub token_count: usize,
}

/// Input to the store's `put`: everything except the derived fields.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}
