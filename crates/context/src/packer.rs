//! Greedy budget packing.
//!
//! Candidates are consumed in ranking order. Each one is either included
//! whole or skipped; text is never truncated. With
//! [`PackingStrategy::ContinueScanning`] a candidate that does not fit the
//! remaining budget is skipped and scanning continues, so a smaller,
//! lower-ranked entry can still use the leftover room.

use autocontext_core::{Budget, ContextResult, EntryId, PackingStrategy, ScoredEntry};
use serde::Serialize;
use tracing::debug;

/// Counters describing one packing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackStats {
    /// Candidates pulled from the ranking.
    pub candidates_considered: usize,
    /// Skipped because their text measured zero tokens.
    pub skipped_empty: usize,
    /// Skipped because they alone exceed `max_tokens`.
    pub skipped_oversized: usize,
    /// Skipped because the remaining budget was too small.
    pub skipped_no_room: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PackOutcome {
    pub result: ContextResult,
    pub stats: PackStats,
}

impl PackOutcome {
    /// Ids of the selected entries, in relevance order.
    pub fn selected_ids(&self) -> Vec<EntryId> {
        self.result
            .entries
            .iter()
            .map(|s| s.entry.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextPacker {
    strategy: PackingStrategy,
}

impl ContextPacker {
    pub fn new(strategy: PackingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> PackingStrategy {
        self.strategy
    }

    /// Select a prefix-ordered subset of `ranking` that fits `budget`.
    ///
    /// # Algorithm
    ///
    /// 1. Pull candidates in descending score.
    /// 2. Skip empty entries and entries larger than the whole budget.
    /// 3. Skip (or stop, under `StopOnFirstMiss`) when the entry does not fit
    ///    the remaining budget.
    /// 4. Otherwise include it.
    /// 5. Stop once `max_entries` is reached, the budget is exactly used, or
    ///    the ranking is exhausted.
    ///
    /// Selected entries keep their ranking order. An empty ranking, a zero
    /// budget, or a budget nothing fits all produce an empty result.
    pub fn pack<I>(&self, ranking: I, budget: Budget) -> PackOutcome
    where
        I: IntoIterator<Item = ScoredEntry>,
    {
        let mut outcome = PackOutcome::default();
        if budget.max_tokens == 0 || budget.max_entries == Some(0) {
            return outcome;
        }

        let stats = &mut outcome.stats;
        let result = &mut outcome.result;

        for candidate in ranking {
            stats.candidates_considered += 1;
            let tokens = candidate.entry.token_count;

            if tokens == 0 {
                stats.skipped_empty += 1;
                continue;
            }
            if tokens > budget.max_tokens {
                stats.skipped_oversized += 1;
                continue;
            }
            if result.cumulative_tokens + tokens > budget.max_tokens {
                stats.skipped_no_room += 1;
                match self.strategy {
                    PackingStrategy::ContinueScanning => continue,
                    PackingStrategy::StopOnFirstMiss => break,
                }
            }

            result.cumulative_tokens += tokens;
            result.entries.push(candidate);

            if budget.max_entries.is_some_and(|max| result.entries.len() >= max)
                || result.cumulative_tokens == budget.max_tokens
            {
                break;
            }
        }

        debug!(
            selected = outcome.result.len(),
            tokens = outcome.result.cumulative_tokens,
            max_tokens = budget.max_tokens,
            considered = outcome.stats.candidates_considered,
            skipped_no_room = outcome.stats.skipped_no_room,
            "Context packed"
        );
        outcome
    }
}
