//! JSON-lines checkpoints.
//!
//! Each line is one JSON-encoded [`Entry`], embedding included, so recovery
//! replays entries without calling the embedding provider. Writes go to a
//! sibling temp file that is then renamed over the checkpoint, so a crash
//! mid-write never leaves a truncated file behind.

use autocontext_core::{Entry, StoreError};
use std::path::Path;
use tracing::{debug, warn};

/// Load entries from a JSONL checkpoint.
///
/// A missing file is an empty store. Corrupted lines are skipped with a warning.
pub fn load_entries(path: &Path) -> Result<Vec<Entry>, StoreError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StoreError::Persistence(format!(
                "Failed to read checkpoint {}: {e}",
                path.display()
            )));
        }
    };

    let entries: Vec<Entry> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str::<Entry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(line = n + 1, error = %e, "Skipping corrupted checkpoint entry");
                None
            }
        })
        .collect();

    debug!(path = %path.display(), count = entries.len(), "Checkpoint loaded");
    Ok(entries)
}

/// Write all entries as JSONL, atomically replacing `path`.
pub fn write_entries(path: &Path, entries: &[Entry]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Persistence(format!("Failed to create checkpoint directory: {e}"))
            })?;
        }
    }

    let mut content = String::new();
    for entry in entries {
        let line = serde_json::to_string(entry).map_err(|e| {
            StoreError::Persistence(format!("Failed to serialize entry {}: {e}", entry.id))
        })?;
        content.push_str(&line);
        content.push('\n');
    }

    let tmp = path.with_extension("jsonl.tmp");
    std::fs::write(&tmp, &content)
        .map_err(|e| StoreError::Persistence(format!("Failed to write checkpoint: {e}")))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(StoreError::Persistence(format!(
            "Failed to move checkpoint into place: {e}"
        )));
    }

    debug!(path = %path.display(), count = entries.len(), "Checkpoint written");
    Ok(())
}
