//! Entry storage for AutoContext.
//!
//! - [`EntryStore`]: content-addressed, bounded, pinnable entry store
//! - [`SimilarityIndex`]: ranks a candidate set against a query vector
//! - [`persist`]: JSONL checkpoint files

pub mod index;
pub mod persist;
pub mod store;

pub use index::{LinearScanIndex, Ranking, SimilarityIndex, cosine_similarity};
pub use store::{EntryStore, PinGuard, PutOutcome, Snapshot, StoreOptions, StoreStats};
