//! The ranking call surface.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::search::strategy::Strategy;

/// Per-field boost weights for the lexical strategy. Absent fields weigh 1.0.
pub type Boosts = HashMap<String, f64>;

/// Required metadata values, ANDed together.
pub type Filters = BTreeMap<String, String>;

fn default_k() -> usize {
    10
}

/// One ranking call.
///
/// ```
/// use strata::search::{SearchRequest, Strategy};
///
/// let request = SearchRequest::new(Strategy::Lexical, "how do I join")
///     .with_k(5)
///     .with_boost("question", 3.0)
///     .with_filter("course", "data-engineering-zoomcamp");
/// assert_eq!(request.k, 5);
/// assert_eq!(request.boost["question"], 3.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Strategy to rank with.
    pub strategy: Strategy,
    /// Free-text query.
    pub query: String,
    /// Maximum number of hits.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Per-field boosts (lexical only).
    #[serde(default)]
    pub boost: Boosts,
    /// Metadata filters.
    #[serde(default)]
    pub filters: Filters,
    /// Field scored by the factorization strategies.
    #[serde(default)]
    pub field: Option<String>,
    /// Latent rank for the factorization strategies.
    #[serde(default)]
    pub rank: Option<usize>,
}

impl SearchRequest {
    /// A request with no boosts, filters, field or rank, returning up to ten
    /// hits.
    pub fn new<S: Into<String>>(strategy: Strategy, query: S) -> Self {
        SearchRequest {
            strategy,
            query: query.into(),
            k: default_k(),
            boost: Boosts::new(),
            filters: Filters::new(),
            field: None,
            rank: None,
        }
    }

    /// Set the result count.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Add a field boost.
    pub fn with_boost<S: Into<String>>(mut self, field: S, weight: f64) -> Self {
        self.boost.insert(field.into(), weight);
        self
    }

    /// Add a filter.
    pub fn with_filter<K: Into<String>, V: Into<String>>(mut self, field: K, value: V) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// Choose the scored field.
    pub fn with_field<S: Into<String>>(mut self, field: S) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Choose the latent rank.
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = Some(rank);
        self
    }
}
