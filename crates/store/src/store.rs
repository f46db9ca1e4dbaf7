//! The entry store: process-wide, content-addressed, bounded.
//!
//! Entries live in a map keyed by [`EntryId`]. Because the id is the content
//! hash of the text, that map is also the dedup index. A second ordered set
//! tracks eviction order for the configured [`EvictionPolicy`].
//!
//! Readers get `Arc`-backed copies of entries, never references into the
//! store. A [`Snapshot`] additionally pins the entries it copied so eviction
//! skips them until the snapshot's [`PinGuard`] is dropped.

use crate::persist;
use autocontext_core::{
    CapacityMode, Clock, Entry, EntryId, EvictionPolicy, Filters, Metadata, NewEntry, StoreError,
    SystemClock, TokenCounter, TokenizerKind, matches_filters,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Store construction options.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Capacity (`N_max`). Must be at least 1.
    pub max_entries: usize,
    pub eviction: EvictionPolicy,
    pub on_full: CapacityMode,
    /// Required embedding length. When `None`, the first stored embedding
    /// fixes it.
    pub dimension: Option<usize>,
    /// JSONL checkpoint location. `None` keeps the store in memory only.
    pub persist_path: Option<PathBuf>,
    pub tokenizer: TokenizerKind,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            eviction: EvictionPolicy::default(),
            on_full: CapacityMode::default(),
            dimension: None,
            persist_path: None,
            tokenizer: TokenizerKind::default(),
        }
    }
}

/// Result of [`EntryStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub id: EntryId,
    /// `false` when the text was already stored.
    pub created: bool,
}

/// Point-in-time store counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub entries: usize,
    pub capacity: usize,
    pub dimension: Option<usize>,
    pub pinned: usize,
    pub total_tokens: usize,
}

/// Thread-safe entry store. Cloning is cheap and shares the same entries.
#[derive(Clone)]
pub struct EntryStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: RwLock<State>,
    // Lock order: `state` before `pins`.
    pins: Mutex<HashMap<EntryId, usize>>,
    checkpoint_lock: Mutex<()>,
    options: StoreOptions,
    counter: Box<dyn TokenCounter>,
    clock: Arc<dyn Clock>,
}

struct State {
    entries: HashMap<EntryId, Slot>,
    order: BTreeSet<EvictionKey>,
    dimension: Option<usize>,
    next_seq: u64,
}

struct Slot {
    entry: Entry,
    seq: u64,
}

/// Ascending order = evicted first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EvictionKey {
    primary: DateTime<Utc>,
    created_at: DateTime<Utc>,
    seq: u64,
    id: EntryId,
}

impl EvictionKey {
    fn of(slot: &Slot, policy: EvictionPolicy) -> Self {
        let primary = match policy {
            EvictionPolicy::Lru => slot.entry.last_accessed_at,
            EvictionPolicy::Fifo => slot.entry.created_at,
        };
        Self {
            primary,
            created_at: slot.entry.created_at,
            seq: slot.seq,
            id: slot.entry.id.clone(),
        }
    }
}

impl State {
    fn insert(&mut self, entry: Entry, policy: EvictionPolicy) {
        let slot = Slot {
            entry,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.order.insert(EvictionKey::of(&slot, policy));
        self.entries.insert(slot.entry.id.clone(), slot);
    }

    fn remove(&mut self, id: &EntryId, policy: EvictionPolicy) -> Option<Entry> {
        let slot = self.entries.remove(id)?;
        self.order.remove(&EvictionKey::of(&slot, policy));
        Some(slot.entry)
    }

    fn sorted_entries(&self) -> Vec<Entry> {
        let mut slots: Vec<&Slot> = self.entries.values().collect();
        slots.sort_by_key(|s| s.seq);
        slots.into_iter().map(|s| s.entry.clone()).collect()
    }
}

impl EntryStore {
    /// An empty in-memory store on the system clock.
    pub fn new(options: StoreOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: StoreOptions, clock: Arc<dyn Clock>) -> Self {
        let state = State {
            entries: HashMap::new(),
            order: BTreeSet::new(),
            dimension: options.dimension,
            next_seq: 0,
        };
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                pins: Mutex::new(HashMap::new()),
                checkpoint_lock: Mutex::new(()),
                counter: options.tokenizer.counter(),
                options,
                clock,
            }),
        }
    }

    /// Open a store, hydrating from the checkpoint file when one is configured.
    pub fn open(options: StoreOptions) -> Result<Self, StoreError> {
        Self::open_with_clock(options, Arc::new(SystemClock))
    }

    pub fn open_with_clock(options: StoreOptions, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let store = Self::with_clock(options, clock);
        if let Some(path) = &store.inner.options.persist_path {
            let loaded = persist::load_entries(path)?;
            store.hydrate(loaded);
        }
        Ok(store)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn pins(&self) -> MutexGuard<'_, HashMap<EntryId, usize>> {
        self.inner.pins.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn policy(&self) -> EvictionPolicy {
        self.inner.options.eviction
    }

    /// Insert an entry, or return the existing id if the text is already stored.
    ///
    /// The dedup check and the insert happen under one write lock, so
    /// concurrent puts of the same text create exactly one entry.
    pub fn put(&self, new: NewEntry) -> Result<PutOutcome, StoreError> {
        let id = EntryId::for_text(&new.text);
        let mut state = self.write();

        if state.entries.contains_key(&id) {
            debug!(id = %id.short(), "Duplicate entry, returning existing id");
            return Ok(PutOutcome { id, created: false });
        }

        check_embedding(&new.embedding)?;
        if let Some(expected) = state.dimension {
            if new.embedding.len() != expected {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: new.embedding.len(),
                });
            }
        }

        let capacity = self.inner.options.max_entries;
        if self.inner.options.on_full == CapacityMode::Reject && state.entries.len() >= capacity {
            return Err(StoreError::CapacityExceeded { capacity });
        }

        let now = self.inner.clock.now();
        let entry = Entry {
            id: id.clone(),
            token_count: self.inner.counter.count(&new.text),
            text: Arc::from(new.text),
            embedding: Arc::from(new.embedding),
            metadata: new.metadata,
            created_at: now,
            last_accessed_at: now,
        };
        state.dimension.get_or_insert(entry.embedding.len());
        debug!(id = %id.short(), tokens = entry.token_count, "Entry stored");
        state.insert(entry, self.policy());

        self.evict_locked(&mut state, Some(&id));
        Ok(PutOutcome { id, created: true })
    }

    pub fn get(&self, id: &EntryId) -> Option<Entry> {
        self.read().entries.get(id).map(|s| s.entry.clone())
    }

    /// Copies of every entry, in insertion order.
    pub fn all(&self) -> Vec<Entry> {
        self.read().sorted_entries()
    }

    /// The id under which `text` is stored, if it is.
    pub fn contains_text(&self, text: &str) -> Option<EntryId> {
        let id = EntryId::for_text(text);
        self.read().entries.contains_key(&id).then_some(id)
    }

    /// Replace an entry's metadata.
    pub fn update_metadata(&self, id: &EntryId, metadata: Metadata) -> Result<Entry, StoreError> {
        let mut state = self.write();
        let slot = state
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        slot.entry.metadata = metadata;
        Ok(slot.entry.clone())
    }

    pub fn remove(&self, id: &EntryId) -> Option<Entry> {
        let removed = self.write().remove(id, self.policy());
        if removed.is_some() {
            debug!(id = %id.short(), "Entry removed");
        }
        removed
    }

    /// Drop every entry. A dimension learned from the first put is kept.
    pub fn clear(&self) {
        let mut state = self.write();
        state.entries.clear();
        state.order.clear();
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// The embedding dimension, once known.
    pub fn dimension(&self) -> Option<usize> {
        self.read().dimension
    }

    pub fn capacity(&self) -> usize {
        self.inner.options.max_entries
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.read();
        let pinned = self.pins().len();
        StoreStats {
            entries: state.entries.len(),
            capacity: self.inner.options.max_entries,
            dimension: state.dimension,
            pinned,
            total_tokens: state.entries.values().map(|s| s.entry.token_count).sum(),
        }
    }

    /// Copy and pin every entry whose metadata satisfies `filters`.
    pub fn snapshot(&self, filters: &Filters) -> Snapshot {
        let state = self.read();
        let mut admitted: Vec<&Slot> = state
            .entries
            .values()
            .filter(|s| matches_filters(filters, &s.entry.metadata))
            .collect();
        admitted.sort_by_key(|s| s.seq);
        let entries: Vec<Entry> = admitted.into_iter().map(|s| s.entry.clone()).collect();

        let ids: Vec<EntryId> = entries.iter().map(|e| e.id.clone()).collect();
        {
            let mut pins = self.pins();
            for id in &ids {
                *pins.entry(id.clone()).or_insert(0) += 1;
            }
        }
        drop(state);

        Snapshot {
            entries,
            guard: PinGuard {
                store: self.clone(),
                ids,
            },
        }
    }

    /// Mark entries as accessed now. Unknown ids are ignored.
    pub fn touch(&self, ids: &[EntryId]) {
        if ids.is_empty() {
            return;
        }
        let now = self.inner.clock.now();
        let policy = self.policy();
        let mut state = self.write();
        let state = &mut *state;
        for id in ids {
            if let Some(slot) = state.entries.get_mut(id) {
                state.order.remove(&EvictionKey::of(slot, policy));
                slot.entry.last_accessed_at = now;
                state.order.insert(EvictionKey::of(slot, policy));
            }
        }
    }

    /// Evict unpinned entries until the store is within capacity.
    pub fn evict_if_needed(&self) -> Vec<EntryId> {
        let mut state = self.write();
        self.evict_locked(&mut state, None)
    }

    fn evict_locked(&self, state: &mut State, protect: Option<&EntryId>) -> Vec<EntryId> {
        let capacity = self.inner.options.max_entries;
        if state.entries.len() <= capacity {
            return Vec::new();
        }
        let excess = state.entries.len() - capacity;

        let victims: Vec<EntryId> = {
            let pins = self.pins();
            state
                .order
                .iter()
                .filter(|k| Some(&k.id) != protect && !pins.contains_key(&k.id))
                .take(excess)
                .map(|k| k.id.clone())
                .collect()
        };

        let policy = self.policy();
        for id in &victims {
            state.remove(id, policy);
        }

        if !victims.is_empty() {
            info!(evicted = victims.len(), remaining = state.entries.len(), "Evicted entries over capacity");
        }
        if victims.len() < excess {
            debug!(
                over_by = excess - victims.len(),
                "Store over capacity, remaining candidates are pinned"
            );
        }
        victims
    }

    fn unpin(&self, ids: &[EntryId]) {
        let mut pins = self.pins();
        for id in ids {
            if let Some(count) = pins.get_mut(id) {
                *count -= 1;
                if *count == 0 {
                    pins.remove(id);
                }
            }
        }
    }

    /// Write all entries to the checkpoint file.
    ///
    /// Returns `false` when no checkpoint path is configured.
    pub fn checkpoint(&self) -> Result<bool, StoreError> {
        let Some(path) = &self.inner.options.persist_path else {
            return Ok(false);
        };
        let _serialized = self
            .inner
            .checkpoint_lock
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let entries = self.all();
        persist::write_entries(path, &entries)?;
        info!(path = %path.display(), entries = entries.len(), "Checkpoint saved");
        Ok(true)
    }

    /// Replay checkpointed entries without re-embedding.
    fn hydrate(&self, loaded: Vec<Entry>) {
        let total = loaded.len();
        let policy = self.policy();
        let mut skipped = 0usize;
        let mut state = self.write();

        for mut entry in loaded {
            let expected_id = EntryId::for_text(&entry.text);
            if entry.id != expected_id {
                warn!(stored = %entry.id.short(), actual = %expected_id.short(), "Checkpoint id does not match text, re-keying");
                entry.id = expected_id;
            }
            if state.entries.contains_key(&entry.id) {
                skipped += 1;
                continue;
            }
            if let Err(e) = check_embedding(&entry.embedding) {
                warn!(id = %entry.id.short(), error = %e, "Skipping checkpoint entry");
                skipped += 1;
                continue;
            }
            if let Some(expected) = state.dimension {
                if entry.embedding.len() != expected {
                    warn!(
                        id = %entry.id.short(),
                        expected,
                        actual = entry.embedding.len(),
                        "Skipping checkpoint entry with mismatched dimension"
                    );
                    skipped += 1;
                    continue;
                }
            }
            entry.token_count = self.inner.counter.count(&entry.text);
            state.dimension.get_or_insert(entry.embedding.len());
            state.insert(entry, policy);
        }

        info!(loaded = total - skipped, skipped, "Store hydrated from checkpoint");
        self.evict_locked(&mut state, None);
    }
}

fn check_embedding(embedding: &[f32]) -> Result<(), StoreError> {
    if embedding.is_empty() {
        return Err(StoreError::InvalidEmbedding("embedding is empty".into()));
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(StoreError::InvalidEmbedding(
            "embedding contains non-finite values".into(),
        ));
    }
    Ok(())
}

/// A filtered, pinned copy of the store's entries.
pub struct Snapshot {
    pub entries: Vec<Entry>,
    guard: PinGuard,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split into the entries and the guard that keeps them pinned.
    pub fn into_parts(self) -> (Vec<Entry>, PinGuard) {
        (self.entries, self.guard)
    }
}

/// Holds pins on a set of entries. Dropping it releases them and lets any
/// deferred eviction run.
pub struct PinGuard {
    store: EntryStore,
    ids: Vec<EntryId>,
}

impl PinGuard {
    pub fn pinned(&self) -> usize {
        self.ids.len()
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        self.store.unpin(&self.ids);
        self.store.evict_if_needed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocontext_core::{FilterCondition, ManualClock, MetadataValue};
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn new_entry(text: &str, embedding: Vec<f32>) -> NewEntry {
        NewEntry {
            text: text.into(),
            embedding,
            metadata: Metadata::new(),
        }
    }

    fn tagged(text: &str, source: &str) -> NewEntry {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), MetadataValue::from(source));
        NewEntry {
            text: text.into(),
            embedding: vec![1.0, 0.0],
            metadata,
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn capped(max_entries: usize) -> StoreOptions {
        StoreOptions {
            max_entries,
            ..StoreOptions::default()
        }
    }

    fn texts(store: &EntryStore) -> Vec<String> {
        store.all().iter().map(|e| e.text.to_string()).collect()
    }

    #[test]
    fn put_and_get() {
        let store = EntryStore::new(StoreOptions::default());
        let outcome = store.put(new_entry("Rust is fast", vec![1.0, 0.0])).unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.id, EntryId::for_text("Rust is fast"));

        let entry = store.get(&outcome.id).unwrap();
        assert_eq!(&*entry.text, "Rust is fast");
        assert_eq!(entry.token_count, 3);
        assert_eq!(entry.created_at, entry.last_accessed_at);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_text_is_idempotent() {
        let store = EntryStore::new(StoreOptions::default());
        let first = store.put(new_entry("same", vec![1.0, 0.0])).unwrap();
        let second = store.put(tagged("same", "other")).unwrap();
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
        // re-submission does not touch metadata
        assert!(store.get(&first.id).unwrap().metadata.is_empty());
    }

    #[test]
    fn first_put_fixes_dimension() {
        let store = EntryStore::new(StoreOptions::default());
        assert_eq!(store.dimension(), None);
        store.put(new_entry("a", vec![1.0, 0.0, 0.0])).unwrap();
        assert_eq!(store.dimension(), Some(3));

        let err = store.put(new_entry("b", vec![1.0, 0.0])).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn configured_dimension_is_enforced() {
        let store = EntryStore::new(StoreOptions {
            dimension: Some(4),
            ..StoreOptions::default()
        });
        assert_eq!(store.dimension(), Some(4));
        assert!(store.put(new_entry("a", vec![1.0, 0.0])).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_degenerate_embeddings() {
        let store = EntryStore::new(StoreOptions::default());
        assert!(matches!(
            store.put(new_entry("empty", vec![])),
            Err(StoreError::InvalidEmbedding(_))
        ));
        assert!(matches!(
            store.put(new_entry("nan", vec![f32::NAN, 1.0])),
            Err(StoreError::InvalidEmbedding(_))
        ));
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn lru_evicts_least_recently_accessed() {
        let clock = clock();
        let store = EntryStore::with_clock(capped(3), clock.clone());
        for text in ["a", "b", "c"] {
            store.put(new_entry(text, vec![1.0, 0.0])).unwrap();
            clock.advance(Duration::seconds(1));
        }
        store.touch(&[EntryId::for_text("a")]);
        clock.advance(Duration::seconds(1));

        store.put(new_entry("d", vec![1.0, 0.0])).unwrap();
        assert_eq!(texts(&store), vec!["a", "c", "d"]);
    }

    #[test]
    fn lru_ties_on_one_timestamp_break_by_insertion() {
        let clock = clock();
        let store = EntryStore::with_clock(capped(2), clock.clone());
        // all share one timestamp
        store.put(new_entry("first", vec![1.0, 0.0])).unwrap();
        store.put(new_entry("second", vec![1.0, 0.0])).unwrap();
        store.put(new_entry("third", vec![1.0, 0.0])).unwrap();
        assert_eq!(texts(&store), vec!["second", "third"]);
    }

    #[test]
    fn lru_access_ties_break_by_creation() {
        let clock = clock();
        let store = EntryStore::with_clock(capped(2), clock.clone());
        store.put(new_entry("a", vec![1.0, 0.0])).unwrap();
        clock.advance(Duration::seconds(1));
        store.put(new_entry("b", vec![1.0, 0.0])).unwrap();
        clock.advance(Duration::seconds(1));
        store.touch(&[EntryId::for_text("b"), EntryId::for_text("a")]);
        clock.advance(Duration::seconds(1));

        store.put(new_entry("c", vec![1.0, 0.0])).unwrap();
        assert_eq!(texts(&store), vec!["b", "c"]);
    }

    #[test]
    fn creation_order_outranks_insertion_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.jsonl");
        let clock = clock();

        let writer = EntryStore::with_clock(StoreOptions::default(), clock.clone());
        writer.put(new_entry("older", vec![1.0, 0.0])).unwrap();
        clock.advance(Duration::seconds(1));
        writer.put(new_entry("newer", vec![1.0, 0.0])).unwrap();
        clock.advance(Duration::seconds(5));

        // same access stamp, written newest first
        let accessed = clock.now();
        let mut entries = writer.all();
        for entry in &mut entries {
            entry.last_accessed_at = accessed;
        }
        entries.reverse();
        persist::write_entries(&path, &entries).unwrap();

        let store = EntryStore::open(StoreOptions {
            persist_path: Some(path),
            ..capped(1)
        })
        .unwrap();
        assert_eq!(texts(&store), vec!["newer"]);
    }

    #[test]
    fn fifo_ignores_access() {
        let clock = clock();
        let store = EntryStore::with_clock(
            StoreOptions {
                eviction: EvictionPolicy::Fifo,
                ..capped(2)
            },
            clock.clone(),
        );
        store.put(new_entry("a", vec![1.0, 0.0])).unwrap();
        clock.advance(Duration::seconds(1));
        store.put(new_entry("b", vec![1.0, 0.0])).unwrap();
        clock.advance(Duration::seconds(1));
        store.touch(&[EntryId::for_text("a")]);
        store.put(new_entry("c", vec![1.0, 0.0])).unwrap();
        assert_eq!(texts(&store), vec!["b", "c"]);
    }

    #[test]
    fn reject_mode_fails_when_full() {
        let store = EntryStore::new(StoreOptions {
            on_full: CapacityMode::Reject,
            ..capped(1)
        });
        store.put(new_entry("a", vec![1.0, 0.0])).unwrap();

        let err = store.put(new_entry("b", vec![1.0, 0.0])).unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { capacity: 1 }));
        // dedup hits still succeed
        assert!(!store.put(new_entry("a", vec![1.0, 0.0])).unwrap().created);
        assert_eq!(texts(&store), vec!["a"]);
    }

    #[test]
    fn pinned_entries_survive_eviction() {
        let clock = clock();
        let store = EntryStore::with_clock(capped(2), clock.clone());
        store.put(new_entry("a", vec![1.0, 0.0])).unwrap();
        clock.advance(Duration::seconds(1));
        store.put(new_entry("b", vec![1.0, 0.0])).unwrap();
        clock.advance(Duration::seconds(1));

        let snapshot = store.snapshot(&Filters::new());
        assert_eq!(snapshot.len(), 2);
        assert_eq!(store.stats().pinned, 2);

        store.put(new_entry("c", vec![1.0, 0.0])).unwrap();
        assert_eq!(store.len(), 3, "pinned entries must not be evicted");

        drop(snapshot);
        assert_eq!(store.stats().pinned, 0);
        assert_eq!(texts(&store), vec!["b", "c"]);
    }

    #[test]
    fn overlapping_snapshots_keep_pins_until_last_drop() {
        let store = EntryStore::new(capped(5));
        store.put(new_entry("a", vec![1.0, 0.0])).unwrap();
        let first = store.snapshot(&Filters::new());
        let second = store.snapshot(&Filters::new());
        assert_eq!(store.stats().pinned, 1);

        drop(first);
        assert_eq!(store.stats().pinned, 1);
        drop(second);
        assert_eq!(store.stats().pinned, 0);
    }

    #[test]
    fn snapshot_applies_filters() {
        let store = EntryStore::new(StoreOptions::default());
        store.put(tagged("from wiki", "wiki")).unwrap();
        store.put(tagged("from docs", "docs")).unwrap();
        store.put(new_entry("untagged", vec![1.0, 0.0])).unwrap();

        let mut filters = Filters::new();
        filters.insert("source".into(), FilterCondition::Equals("docs".into()));
        let (entries, guard) = store.snapshot(&filters).into_parts();
        assert_eq!(entries.len(), 1);
        assert_eq!(&*entries[0].text, "from docs");
        assert_eq!(guard.pinned(), 1);

        filters.insert("source".into(), FilterCondition::Equals("blog".into()));
        let none = store.snapshot(&filters);
        assert!(none.is_empty());
        assert_eq!(none.len(), 0);
        assert_eq!(store.stats().pinned, 1);
    }

    #[test]
    fn snapshot_copies_survive_removal() {
        let store = EntryStore::new(StoreOptions::default());
        let id = store.put(new_entry("gone soon", vec![1.0, 0.0])).unwrap().id;
        let snapshot = store.snapshot(&Filters::new());
        assert!(store.remove(&id).is_some());
        assert!(store.get(&id).is_none());
        assert_eq!(&*snapshot.entries[0].text, "gone soon");
    }

    #[test]
    fn update_metadata_replaces() {
        let store = EntryStore::new(StoreOptions::default());
        let id = store.put(tagged("doc", "wiki")).unwrap().id;

        let mut metadata = Metadata::new();
        metadata.insert("page".into(), MetadataValue::Int(7));
        let updated = store.update_metadata(&id, metadata).unwrap();
        assert_eq!(updated.metadata.len(), 1);
        assert_eq!(updated.metadata["page"], MetadataValue::Int(7));

        let missing = store.update_metadata(&EntryId::for_text("nope"), Metadata::new());
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn touch_updates_last_accessed() {
        let clock = clock();
        let store = EntryStore::with_clock(StoreOptions::default(), clock.clone());
        let id = store.put(new_entry("a", vec![1.0, 0.0])).unwrap().id;
        clock.advance(Duration::minutes(5));
        store.touch(&[id.clone(), EntryId::for_text("unknown")]);

        let entry = store.get(&id).unwrap();
        assert_eq!(entry.last_accessed_at - entry.created_at, Duration::minutes(5));
    }

    #[test]
    fn clear_and_stats() {
        let store = EntryStore::new(StoreOptions {
            tokenizer: TokenizerKind::Words,
            ..capped(5)
        });
        store.put(new_entry("one two", vec![1.0, 0.0])).unwrap();
        store.put(new_entry("three four five", vec![0.0, 1.0])).unwrap();

        let stats = store.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.capacity, 5);
        assert_eq!(stats.dimension, Some(2));
        assert_eq!(stats.total_tokens, 5);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), Some(2));
    }

    #[test]
    fn concurrent_identical_puts_create_one_entry() {
        let store = EntryStore::new(StoreOptions::default());
        let outcomes: Vec<PutOutcome> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| store.put(new_entry("shared", vec![1.0, 0.0])).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn checkpoint_without_path_is_noop() {
        let store = EntryStore::new(StoreOptions::default());
        assert!(!store.checkpoint().unwrap());
    }

    #[test]
    fn checkpoint_and_reopen() {
        let dir = TempDir::new().unwrap();
        let options = StoreOptions {
            persist_path: Some(dir.path().join("entries.jsonl")),
            ..StoreOptions::default()
        };

        let store = EntryStore::open(options.clone()).unwrap();
        store.put(tagged("first", "wiki")).unwrap();
        store.put(new_entry("second", vec![0.0, 1.0])).unwrap();
        assert!(store.checkpoint().unwrap());

        let reopened = EntryStore::open(options).unwrap();
        assert_eq!(texts(&reopened), vec!["first", "second"]);
        assert_eq!(reopened.dimension(), Some(2));
        let first = reopened.get(&EntryId::for_text("first")).unwrap();
        assert_eq!(first.metadata["source"], MetadataValue::from("wiki"));
        assert_eq!(&*first.embedding, &[1.0f32, 0.0]);
    }

    #[test]
    fn hydrate_recounts_tokens_and_skips_bad_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.jsonl");

        let writer = EntryStore::new(StoreOptions::default());
        writer.put(new_entry("alpha beta gamma", vec![1.0, 0.0])).unwrap();
        let mut entries = writer.all();
        let mut odd = entries[0].clone();
        odd.text = Arc::from("wrong size");
        odd.id = EntryId::for_text("wrong size");
        odd.embedding = Arc::from(vec![1.0f32, 0.0, 0.0]);
        entries.push(odd);
        persist::write_entries(&path, &entries).unwrap();

        let store = EntryStore::open(StoreOptions {
            persist_path: Some(path),
            tokenizer: TokenizerKind::Words,
            ..StoreOptions::default()
        })
        .unwrap();
        assert_eq!(texts(&store), vec!["alpha beta gamma"]);
        assert_eq!(store.all()[0].token_count, 3);
    }

    #[test]
    fn hydrate_evicts_down_to_capacity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.jsonl");
        let clock = clock();

        let writer = EntryStore::with_clock(StoreOptions::default(), clock.clone());
        for text in ["a", "b", "c"] {
            writer.put(new_entry(text, vec![1.0, 0.0])).unwrap();
            clock.advance(Duration::seconds(1));
        }
        persist::write_entries(&path, &writer.all()).unwrap();

        let store = EntryStore::open(StoreOptions {
            persist_path: Some(path),
            ..capped(2)
        })
        .unwrap();
        assert_eq!(texts(&store), vec!["b", "c"]);
    }
}
