//! The client facade: the two operations callers actually use.
//!
//! ```text
//! add_entry:  validate → dedup check → embed → store.put → checkpoint
//! get_entry:  validate → embed query → snapshot (pin) → rank → pack → touch → render
//! ```
//!
//! Embedding is the only await point. Everything after the query vector is
//! available runs synchronously, so a cancelled `get_entry` either never
//! touched the store or ran to completion.

use crate::api::{AddEntryRequest, AddEntryResponse, GetEntryRequest, GetEntryResponse};
use autocontext_config::AppConfig;
use autocontext_context::{ContextPacker, ContextRenderer};
use autocontext_core::{
    Budget, EmbeddingProvider, Entry, EntryId, Error, Filters, Metadata, NewEntry,
    PackingStrategy, Result, StoreError, ValidationError,
};
use autocontext_store::{EntryStore, LinearScanIndex, SimilarityIndex, StoreOptions, StoreStats};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Retrieval and write-path settings for the facade.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub default_max_tokens: usize,
    pub default_max_entries: Option<usize>,
    pub min_score: Option<f32>,
    pub packing: PackingStrategy,
    /// Write a checkpoint after every mutation and every retrieval that
    /// selects entries (no-op without a persist path).
    pub checkpoint_on_write: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            default_max_tokens: 2048,
            default_max_entries: None,
            min_score: None,
            packing: PackingStrategy::default(),
            checkpoint_on_write: true,
        }
    }
}

impl From<&AppConfig> for ClientSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_max_tokens: config.retrieval.default_max_tokens,
            default_max_entries: config.retrieval.default_max_entries,
            min_score: config.retrieval.min_score,
            packing: config.retrieval.packing,
            checkpoint_on_write: config.store.checkpoint_on_write,
        }
    }
}

/// Store options derived from configuration.
pub fn store_options(config: &AppConfig) -> StoreOptions {
    StoreOptions {
        max_entries: config.store.max_entries,
        eviction: config.store.eviction,
        on_full: config.store.on_full,
        dimension: config.embedding.dimension,
        persist_path: config.store.persist_path.clone(),
        tokenizer: config.store.tokenizer,
    }
}

pub struct AutoContextRagClient {
    store: EntryStore,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SimilarityIndex>,
    packer: ContextPacker,
    renderer: ContextRenderer,
    settings: ClientSettings,
}

impl AutoContextRagClient {
    pub fn new(
        store: EntryStore,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: ClientSettings,
    ) -> Self {
        let index = match settings.min_score {
            Some(min) => LinearScanIndex::new().with_min_score(min),
            None => LinearScanIndex::new(),
        };
        Self {
            store,
            embedder,
            index: Arc::new(index),
            packer: ContextPacker::new(settings.packing),
            renderer: ContextRenderer::default(),
            settings,
        }
    }

    /// Open the configured store and build the configured embedding provider.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder = autocontext_providers::build_from_config(&config.embedding).map_err(|e| {
            Error::Config {
                message: e.to_string(),
            }
        })?;
        let store = EntryStore::open(store_options(config))?;
        info!(
            entries = store.len(),
            capacity = store.capacity(),
            provider = %embedder.name(),
            "AutoContext client ready"
        );
        Ok(Self::new(store, embedder, ClientSettings::from(config)))
    }

    /// Swap the similarity index.
    pub fn with_index(mut self, index: Arc<dyn SimilarityIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn with_renderer(mut self, renderer: ContextRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Ingest a text entry.
    ///
    /// Identical text resolves to the existing entry (`created: false`)
    /// without calling the embedding provider or touching its metadata.
    pub async fn add_entry(&self, request: AddEntryRequest) -> Result<AddEntryResponse> {
        const OP: &str = "add_entry";
        validate_text(OP, &request.text)?;
        let metadata = request.metadata.unwrap_or_default();
        validate_keys(OP, "metadata", metadata.keys())?;

        if let Some(id) = self.store.contains_text(&request.text) {
            debug!(id = %id.short(), "Duplicate text, skipping embedding");
            return Ok(AddEntryResponse { id, created: false });
        }

        let embedding = self
            .embedder
            .embed(&request.text)
            .await
            .map_err(|e| Error::embedding_unavailable(OP, e))?;

        let outcome = self.store.put(NewEntry {
            text: request.text,
            embedding,
            metadata,
        })?;

        if outcome.created {
            info!(id = %outcome.id.short(), entries = self.store.len(), "Entry added");
            self.checkpoint_after_write()?;
        }

        Ok(AddEntryResponse {
            id: outcome.id,
            created: outcome.created,
        })
    }

    /// Assemble the most relevant entries that fit the request's budget.
    ///
    /// An empty store, a zero budget, or nothing fitting all yield an empty
    /// response rather than an error.
    pub async fn get_entry(&self, request: GetEntryRequest) -> Result<GetEntryResponse> {
        const OP: &str = "get_entry";
        validate_text(OP, &request.text)?;
        let filters = request.filters.unwrap_or_default();
        validate_keys(OP, "filters", filters.keys())?;

        let budget = Budget {
            max_tokens: request.max_tokens.unwrap_or(self.settings.default_max_tokens),
            max_entries: request.max_entries.or(self.settings.default_max_entries),
        };

        if self.store.is_empty() || budget.max_tokens == 0 || budget.max_entries == Some(0) {
            debug!(max_tokens = budget.max_tokens, "Nothing to retrieve");
            return Ok(GetEntryResponse::default());
        }

        let query = self
            .embedder
            .embed(&request.text)
            .await
            .map_err(|e| Error::embedding_unavailable(OP, e))?;

        Ok(self.assemble(&query, &filters, budget)?)
    }

    fn assemble(
        &self,
        query: &[f32],
        filters: &Filters,
        budget: Budget,
    ) -> std::result::Result<GetEntryResponse, StoreError> {
        if let Some(expected) = self.store.dimension() {
            if query.len() != expected {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let (candidates, _pins) = self.store.snapshot(filters).into_parts();
        let candidate_count = candidates.len();

        let ranking = self.index.rank(query, candidates);
        let outcome = self.packer.pack(ranking, budget);
        let selected = outcome.selected_ids();
        self.store.touch(&selected);
        // Access stamps drive LRU across restarts, so they are checkpointed too.
        if self.settings.checkpoint_on_write && !selected.is_empty() {
            self.store.checkpoint()?;
        }

        let context = self.renderer.render(&outcome.result);
        debug!(
            index = %self.index.name(),
            candidates = candidate_count,
            selected = outcome.result.len(),
            tokens = outcome.result.cumulative_tokens,
            skipped_oversized = outcome.stats.skipped_oversized,
            skipped_no_room = outcome.stats.skipped_no_room,
            "Context assembled"
        );
        Ok(GetEntryResponse::from_result(outcome.result, context))
    }

    /// `add_entry` from a raw JSON payload.
    pub async fn add_entry_json(&self, payload: &Value) -> Result<AddEntryResponse> {
        let request = AddEntryRequest::from_json(payload)?;
        self.add_entry(request).await
    }

    /// `get_entry` from a raw JSON payload.
    pub async fn get_entry_json(&self, payload: &Value) -> Result<GetEntryResponse> {
        let request = GetEntryRequest::from_json(payload)?;
        self.get_entry(request).await
    }

    /// Replace an entry's metadata.
    pub fn update_metadata(&self, id: &EntryId, metadata: Metadata) -> Result<Entry> {
        validate_keys("update_metadata", "metadata", metadata.keys())?;
        let entry = self.store.update_metadata(id, metadata)?;
        self.checkpoint_after_write()?;
        Ok(entry)
    }

    pub fn entry(&self, id: &EntryId) -> Option<Entry> {
        self.store.get(id)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Write a checkpoint now. Returns `false` when persistence is off.
    pub fn checkpoint(&self) -> Result<bool> {
        Ok(self.store.checkpoint()?)
    }

    fn checkpoint_after_write(&self) -> Result<()> {
        if self.settings.checkpoint_on_write {
            self.store.checkpoint()?;
        }
        Ok(())
    }
}

fn validate_text(op: &'static str, text: &str) -> std::result::Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new(op, "text", "must not be empty"));
    }
    Ok(())
}

fn validate_keys<'a>(
    op: &'static str,
    field: &str,
    mut keys: impl Iterator<Item = &'a String>,
) -> std::result::Result<(), ValidationError> {
    if keys.any(|k| k.trim().is_empty()) {
        return Err(ValidationError::new(op, field, "keys must not be empty"));
    }
    Ok(())
}
