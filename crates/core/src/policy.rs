//! Tunable policies for capacity, eviction and packing.
//!
//! These are configuration rather than hard-coded behavior; defaults match the
//! common retrieval setup (LRU eviction, evict-on-full, continue scanning).

use serde::{Deserialize, Serialize};

/// Which entry to evict when the store is over capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Least recently accessed first, ties by oldest creation.
    #[default]
    Lru,
    /// Oldest creation first, regardless of access.
    Fifo,
}

/// What a full store does with a new entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityMode {
    /// Insert, then evict per [`EvictionPolicy`].
    #[default]
    Evict,
    /// Refuse the insert with `CapacityExceeded`.
    Reject,
}

/// How the packer reacts to a candidate that does not fit the remaining budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackingStrategy {
    /// Skip it and keep scanning lower-ranked candidates.
    #[default]
    ContinueScanning,
    /// Stop packing at the first candidate that does not fit.
    StopOnFirstMiss,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_use_snake_case_names() {
        let json = serde_json::to_string(&PackingStrategy::StopOnFirstMiss).unwrap();
        assert_eq!(json, "\"stop_on_first_miss\"");
        let parsed: EvictionPolicy = serde_json::from_str("\"fifo\"").unwrap();
        assert_eq!(parsed, EvictionPolicy::Fifo);
        let parsed: CapacityMode = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(parsed, CapacityMode::Reject);
    }
}
