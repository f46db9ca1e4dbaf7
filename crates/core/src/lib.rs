//! # AutoContext Core
//!
//! Domain types, traits, and error definitions for the AutoContext retrieval
//! engine. It depends only on small utility crates (serde, hashing, time,
//! async-trait) and defines the domain model that all other crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every external seam is a trait here (embedding providers, token counters,
//! clocks). Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod clock;
pub mod embedding;
pub mod entry;
pub mod error;
pub mod metadata;
pub mod policy;
pub mod query;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use clock::{Clock, ManualClock, SystemClock};
pub use embedding::EmbeddingProvider;
pub use entry::{Entry, EntryId, NewEntry, content_hash};
pub use error::{Error, ProviderError, Result, StoreError, ValidationError};
pub use metadata::{FilterCondition, FilterRange, Filters, Metadata, MetadataValue, matches_filters};
pub use policy::{CapacityMode, EvictionPolicy, PackingStrategy};
pub use query::{Budget, ContextResult, ScoredEntry};
pub use token::{CharEstimate, TokenCounter, TokenizerKind, WordCount};
