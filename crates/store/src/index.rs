//! Similarity ranking.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity
//! - A linear-scan [`SimilarityIndex`] producing a lazy, descending [`Ranking`]
//!
//! Ranking order is total and reproducible: score descending, then
//! `created_at` ascending (oldest first), then id ascending.

use autocontext_core::{Entry, ScoredEntry};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Cosine of the angle between `a` and `b`, accumulated in `f64`.
///
/// Mismatched lengths, empty input and (near-)zero vectors score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, sq_a, sq_b) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |acc, (&x, &y)| {
        let (x, y) = (f64::from(x), f64::from(y));
        (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
    });

    let magnitude = (sq_a * sq_b).sqrt();
    if magnitude < 1e-10 {
        0.0
    } else {
        (dot / magnitude) as f32
    }
}

/// A pull-based sequence of candidates in descending relevance.
///
/// Finite (bounded by the candidate set) and fresh per call; consumers may
/// stop at any point.
pub type Ranking = Box<dyn Iterator<Item = ScoredEntry> + Send>;

/// Produces a [`Ranking`] of candidates for a query vector.
///
/// Candidates arrive already filtered; an index only orders them.
pub trait SimilarityIndex: Send + Sync {
    fn name(&self) -> &str;

    fn rank(&self, query: &[f32], candidates: Vec<Entry>) -> Ranking;
}

/// Exhaustive cosine scan.
///
/// Each candidate is scored exactly once; ordering is deferred to a binary
/// heap so a consumer that stops early never pays for a full sort.
#[derive(Debug, Clone, Default)]
pub struct LinearScanIndex {
    min_score: Option<f32>,
}

impl LinearScanIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop candidates scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

impl SimilarityIndex for LinearScanIndex {
    fn name(&self) -> &str {
        "linear_scan"
    }

    fn rank(&self, query: &[f32], candidates: Vec<Entry>) -> Ranking {
        let min_score = self.min_score;
        let heap: BinaryHeap<Ranked> = candidates
            .into_iter()
            .filter_map(|entry| {
                let score = cosine_similarity(&entry.embedding, query);
                match min_score {
                    Some(min) if score < min => None,
                    _ => Some(Ranked(ScoredEntry { entry, score })),
                }
            })
            .collect();

        Box::new(HeapRanking { heap })
    }
}

struct HeapRanking {
    heap: BinaryHeap<Ranked>,
}

impl Iterator for HeapRanking {
    type Item = ScoredEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.heap.pop().map(|r| r.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.heap.len(), Some(self.heap.len()))
    }
}

/// Heap wrapper: "greater" means "ranks earlier".
struct Ranked(ScoredEntry);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.0, &other.0);
        a.score
            .total_cmp(&b.score)
            .then_with(|| b.entry.created_at.cmp(&a.entry.created_at))
            .then_with(|| b.entry.id.cmp(&a.entry.id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}
