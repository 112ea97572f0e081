//! Ranked results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::corpus::Record;
use crate::search::strategy::Strategy;

/// A ranked record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Corpus position of the record.
    pub doc_index: usize,
    /// Similarity score.
    pub score: f64,
    /// The record's fields.
    pub record: Record,
}

/// The outcome of one ranking call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Hits, best first.
    pub hits: Vec<SearchHit>,
    /// Strategy that ranked them.
    pub strategy: Strategy,
    /// The query as given.
    pub query: String,
    /// Number of hits returned.
    pub total_results: usize,
    /// Wall time spent ranking.
    pub elapsed: Duration,
}

impl SearchResults {
    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Corpus positions of the hits, best first.
    pub fn doc_indices(&self) -> Vec<usize> {
        self.hits.iter().map(|h| h.doc_index).collect()
    }

    /// Highest score, if any hit was returned.
    pub fn max_score(&self) -> Option<f64> {
        self.hits.first().map(|h| h.score)
    }
}
