//! Retrieval budget and result types.

use crate::entry::Entry;
use serde::{Deserialize, Serialize};

/// The size limits for a single context result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Maximum total `token_count` across selected entries.
    pub max_tokens: usize,

    /// Optional cap on the number of selected entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl Budget {
    pub fn tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            max_entries: None,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }
}

/// A ranked candidate: an entry and its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: Entry,
    pub score: f32,
}

/// The packed context for one query.
#[derive(Debug, Clone, Default)]
pub struct ContextResult {
    /// Selected entries, most relevant first.
    pub entries: Vec<ScoredEntry>,
    /// Sum of the selected entries' token counts.
    pub cumulative_tokens: usize,
}

impl ContextResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
