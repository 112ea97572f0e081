//! Top-k collection.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A candidate with its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    /// Corpus position.
    pub doc_index: usize,
    /// Similarity score.
    pub score: f64,
}

impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    /// Better hits order first: higher score, then lower corpus index.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.doc_index.cmp(&other.doc_index))
    }
}

/// Keeps the best `max_docs` candidates seen.
///
/// The heap's top is the worst kept hit, so each offer costs `O(log k)`.
#[derive(Debug)]
pub struct TopDocsCollector {
    max_docs: usize,
    hits: BinaryHeap<ScoredDoc>,
    total_hits: usize,
}

impl TopDocsCollector {
    /// Create a collector for up to `max_docs` hits.
    pub fn new(max_docs: usize) -> Self {
        TopDocsCollector {
            max_docs,
            hits: BinaryHeap::with_capacity(max_docs.min(1024) + 1),
            total_hits: 0,
        }
    }

    /// Offer a candidate.
    pub fn collect(&mut self, doc_index: usize, score: f64) {
        self.total_hits += 1;
        if self.max_docs == 0 {
            return;
        }
        let doc = ScoredDoc { doc_index, score };
        if self.hits.len() < self.max_docs {
            self.hits.push(doc);
        } else if let Some(mut worst) = self.hits.peek_mut() {
            if doc < *worst {
                *worst = doc;
            }
        }
    }

    /// Number of candidates offered.
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// Kept hits, best first.
    pub fn into_sorted(self) -> Vec<ScoredDoc> {
        self.hits.into_sorted_vec()
    }
}

/// Rank `candidates` by `scores` and keep the best `k`.
pub fn top_k(scores: &[f64], candidates: &[usize], k: usize) -> Vec<ScoredDoc> {
    let mut collector = TopDocsCollector::new(k);
    for &i in candidates {
        collector.collect(i, scores[i]);
    }
    collector.into_sorted()
}
