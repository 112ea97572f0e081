//! # Strata
//!
//! A multi-strategy document retrieval engine for small and medium corpora
//! of short records, such as course FAQs.
//!
//! ## Features
//!
//! - TF-IDF ranking summed over several text fields with per-field boosts
//! - Latent ranking through truncated SVD or non-negative factorization,
//!   fitted once per (field, rank) and cached
//! - Semantic ranking with a pluggable text encoder and a checksummed
//!   on-disk embedding cache
//! - Exact-match metadata filters and stable top-k selection
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use strata::config::{FactorizationConfig, WeightingConfig};
//! use strata::corpus::Record;
//! use strata::index::CorpusIndex;
//! use strata::search::{RankingEngine, SearchRequest, Strategy};
//!
//! let corpus = vec![
//!     Record::from_pairs([("text", "python install guide"), ("course", "A")]),
//!     Record::from_pairs([("text", "java setup tutorial"), ("course", "B")]),
//! ];
//! let index = CorpusIndex::build(corpus, &["text".to_string()], &WeightingConfig::default())?;
//! let engine = RankingEngine::new(Arc::new(index), FactorizationConfig::default());
//!
//! let request = SearchRequest::new(Strategy::Lexical, "How do I install Python").with_k(1);
//! let results = engine.search(&request)?;
//! assert_eq!(results.hits[0].doc_index, 0);
//! # Ok::<(), strata::error::StrataError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod index;
pub mod latent;
pub mod search;
pub mod service;
pub mod similarity;

pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::corpus::Record;
    pub use crate::error::{Result, StrataError};
    pub use crate::search::{SearchRequest, SearchResults, Strategy};
    pub use crate::service::SearchService;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
