//! Rendering a packed result into a single context string.

use autocontext_core::ContextResult;
use std::fmt::Write;

/// Renders selected entries as numbered, attributed text blocks.
///
/// ```text
/// [1] id=3f1a9c0b2d4e score=0.912 source=handbook.md
/// Entry text...
///
/// [2] id=...
/// ```
#[derive(Debug, Clone)]
pub struct ContextRenderer {
    attribution_key: String,
}

impl Default for ContextRenderer {
    fn default() -> Self {
        Self {
            attribution_key: "source".into(),
        }
    }
}

impl ContextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata key shown in each block header (default `source`).
    pub fn with_attribution_key(mut self, key: impl Into<String>) -> Self {
        self.attribution_key = key.into();
        self
    }

    pub fn render(&self, result: &ContextResult) -> String {
        let mut out = String::new();
        for (i, scored) in result.entries.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            let entry = &scored.entry;
            let _ = write!(
                out,
                "[{}] id={} score={:.3}",
                i + 1,
                entry.id.short(),
                scored.score
            );
            if let Some(value) = entry.metadata.get(&self.attribution_key) {
                let _ = write!(out, " {}={}", self.attribution_key, value);
            }
            out.push('\n');
            out.push_str(&entry.text);
        }
        out
    }
}
