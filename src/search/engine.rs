//! The ranking engine.
//!
//! One entry point per strategy plus [`RankingEngine::search`], which
//! dispatches a [`SearchRequest`]. Every entry point follows the same steps:
//!
//! 1. reject `k == 0`,
//! 2. build the candidate set from the filters,
//! 3. compute one score per record,
//! 4. keep the best `k` candidates, ties broken by corpus order.
//!
//! The engine is immutable apart from the latent projection cache and can be
//! shared between threads behind an `Arc`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::config::FactorizationConfig;
use crate::embedding::EmbeddingStore;
use crate::error::{Result, StrataError};
use crate::index::corpus_index::CorpusIndex;
use crate::latent::{FactorizationMode, LatentProjector};
use crate::search::collector::top_k;
use crate::search::filter::eligible;
use crate::search::request::{Boosts, Filters, SearchRequest};
use crate::search::results::{SearchHit, SearchResults};
use crate::search::strategy::{Strategy, StrategyInfo};
use crate::similarity::cosine_sparse;

/// Ranks records of one [`CorpusIndex`].
pub struct RankingEngine {
    index: Arc<CorpusIndex>,
    projector: LatentProjector,
    embeddings: Option<Arc<EmbeddingStore>>,
    default_field: String,
    default_rank: usize,
}

impl fmt::Debug for RankingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankingEngine")
            .field("records", &self.index.len())
            .field("fields", &self.index.fields())
            .field("embeddings", &self.embeddings.as_ref().map(|e| e.is_ready()))
            .field("default_field", &self.default_field)
            .field("default_rank", &self.default_rank)
            .finish()
    }
}

impl RankingEngine {
    /// Create an engine without embeddings.
    ///
    /// Single-field strategies default to the `text` field when it is
    /// indexed, otherwise to the first indexed field.
    pub fn new(index: Arc<CorpusIndex>, config: FactorizationConfig) -> Self {
        let default_field = if index.fields().iter().any(|f| f == "text") {
            "text".to_string()
        } else {
            index.fields()[0].clone()
        };
        let default_rank = config.default_rank;
        RankingEngine {
            projector: LatentProjector::new(Arc::clone(&index), config),
            index,
            embeddings: None,
            default_field,
            default_rank,
        }
    }

    /// Attach an embedding store, enabling the embedding strategy when the
    /// store is ready.
    pub fn with_embeddings(mut self, store: Arc<EmbeddingStore>) -> Self {
        self.embeddings = Some(store);
        self
    }

    /// Set the field used when a request names none.
    pub fn with_default_field<S: Into<String>>(mut self, field: S) -> Result<Self> {
        let field = field.into();
        self.index.field(&field)?;
        self.default_field = field;
        Ok(self)
    }

    /// The index being ranked.
    pub fn index(&self) -> &Arc<CorpusIndex> {
        &self.index
    }

    /// The latent projector, with its cache.
    pub fn projector(&self) -> &LatentProjector {
        &self.projector
    }

    /// The attached embedding store, if any.
    pub fn embeddings(&self) -> Option<&Arc<EmbeddingStore>> {
        self.embeddings.as_ref()
    }

    /// Field used when a request names none.
    pub fn default_field(&self) -> &str {
        &self.default_field
    }

    /// Strategies that can run right now.
    pub fn available_strategies(&self) -> BTreeSet<Strategy> {
        Strategy::ALL
            .into_iter()
            .filter(|s| self.is_available(*s))
            .collect()
    }

    /// Descriptors of the available strategies.
    pub fn strategy_infos(&self) -> Vec<StrategyInfo> {
        self.available_strategies()
            .into_iter()
            .map(|s| s.info())
            .collect()
    }

    /// Whether `strategy` can run right now.
    pub fn is_available(&self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Embedding => self.embeddings.as_ref().is_some_and(|e| e.is_ready()),
            _ => true,
        }
    }

    /// Distinct values of a metadata field, in order of first appearance.
    pub fn available_categories(&self, field: &str) -> Vec<String> {
        self.index.distinct_values(field)
    }

    /// Run a request.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let start = Instant::now();
        let field = request.field.as_deref().unwrap_or(&self.default_field);
        let rank = request.rank.unwrap_or(self.default_rank);

        if request.strategy != Strategy::Lexical && !request.boost.is_empty() {
            debug!(strategy = %request.strategy, "Ignoring boosts for a single-score strategy");
        }

        let hits = match request.strategy {
            Strategy::Lexical => {
                self.search_lexical(&request.query, request.k, &request.boost, &request.filters)?
            }
            Strategy::LinearFactorization => {
                self.search_svd(&request.query, request.k, field, rank, &request.filters)?
            }
            Strategy::NonNegativeFactorization => {
                self.search_nmf(&request.query, request.k, field, rank, &request.filters)?
            }
            Strategy::Embedding => self.search_embedding(
                &request.query,
                request.k,
                request.field.as_deref(),
                &request.filters,
            )?,
        };

        let elapsed = start.elapsed();
        debug!(
            strategy = %request.strategy,
            k = request.k,
            hits = hits.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "Ranked query"
        );

        Ok(SearchResults {
            total_results: hits.len(),
            hits,
            strategy: request.strategy,
            query: request.query.clone(),
            elapsed,
        })
    }

    /// Boost-weighted sum of per-field TF-IDF cosines.
    ///
    /// Fields absent from `boost` weigh 1.0; a weight of 0 removes the field
    /// entirely.
    pub fn search_lexical(
        &self,
        query: &str,
        k: usize,
        boost: &Boosts,
        filters: &Filters,
    ) -> Result<Vec<SearchHit>> {
        check_k(k)?;
        self.check_boosts(boost)?;
        let candidates = eligible(self.index.records(), filters)?;

        let mut scores = vec![0.0; self.index.len()];
        for representation in self.index.representations() {
            let weight = boost.get(representation.name()).copied().unwrap_or(1.0);
            if weight == 0.0 {
                continue;
            }
            let q = representation.transform(query)?;
            if q.is_zero() {
                continue;
            }
            let q_row = q.as_row();
            let q_norm = q_row.norm();
            let matrix = representation.matrix();
            let norms = representation.row_norms();

            scores.par_iter_mut().enumerate().for_each(|(i, score)| {
                *score += weight * cosine_sparse(&matrix.row(i), norms[i], &q_row, q_norm);
            });
        }

        Ok(self.collect(&scores, &candidates, k))
    }

    /// Cosine in the truncated-SVD space of `field` at `rank`.
    pub fn search_svd(
        &self,
        query: &str,
        k: usize,
        field: &str,
        rank: usize,
        filters: &Filters,
    ) -> Result<Vec<SearchHit>> {
        self.search_latent(query, k, field, rank, filters, FactorizationMode::Linear)
    }

    /// Cosine in the NMF space of `field` at `rank`.
    pub fn search_nmf(
        &self,
        query: &str,
        k: usize,
        field: &str,
        rank: usize,
        filters: &Filters,
    ) -> Result<Vec<SearchHit>> {
        self.search_latent(query, k, field, rank, filters, FactorizationMode::NonNegative)
    }

    fn search_latent(
        &self,
        query: &str,
        k: usize,
        field: &str,
        rank: usize,
        filters: &Filters,
        mode: FactorizationMode,
    ) -> Result<Vec<SearchHit>> {
        check_k(k)?;
        let representation = self.index.field(field)?;
        let candidates = eligible(self.index.records(), filters)?;

        let projection = self.projector.project(field, rank, mode)?;
        let q = representation.transform(query)?;
        let scores = projection.scores(&q);

        Ok(self.collect(&scores, &candidates, k))
    }

    /// Cosine against the semantic embeddings. `field` is accepted for
    /// symmetry with the other strategies and ignored, since embeddings cover
    /// all text fields combined.
    pub fn search_embedding(
        &self,
        query: &str,
        k: usize,
        field: Option<&str>,
        filters: &Filters,
    ) -> Result<Vec<SearchHit>> {
        check_k(k)?;
        let store = self
            .embeddings
            .as_ref()
            .filter(|e| e.is_ready())
            .ok_or_else(|| StrataError::StrategyUnavailable(Strategy::Embedding.to_string()))?;
        if let Some(field) = field {
            debug!(field, "Embedding strategy ignores the field selector");
        }
        let candidates = eligible(self.index.records(), filters)?;

        let q = store.encode_query(query)?;
        let scores = store.scores(&q)?;

        Ok(self.collect(&scores, &candidates, k))
    }

    fn check_boosts(&self, boost: &Boosts) -> Result<()> {
        for (field, &weight) in boost {
            if !self.index.fields().iter().any(|f| f == field) {
                return Err(StrataError::invalid_parameter(format!(
                    "boost names field '{field}', which is not an indexed text field"
                )));
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(StrataError::invalid_parameter(format!(
                    "boost for field '{field}' must be a finite non-negative number, got {weight}"
                )));
            }
        }
        Ok(())
    }

    fn collect(&self, scores: &[f64], candidates: &[usize], k: usize) -> Vec<SearchHit> {
        top_k(scores, candidates, k)
            .into_iter()
            .map(|doc| SearchHit {
                doc_index: doc.doc_index,
                score: doc.score,
                record: self.index.records()[doc.doc_index].clone(),
            })
            .collect()
    }
}

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(StrataError::InvalidResultCount(k));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightingConfig;
    use crate::corpus::Record;

    fn engine() -> RankingEngine {
        let records = vec![
            Record::from_pairs([
                ("question", "how to install python"),
                ("text", "python install guide"),
                ("course", "A"),
            ]),
            Record::from_pairs([
                ("question", "java environment"),
                ("text", "java setup tutorial"),
                ("course", "B"),
            ]),
            Record::from_pairs([
                ("question", "python notebooks"),
                ("text", "jupyter tutorial for python"),
                ("course", "A"),
            ]),
        ];
        let fields = vec!["question".to_string(), "text".to_string()];
        let index = CorpusIndex::build(records, &fields, &WeightingConfig::default()).unwrap();
        let config = FactorizationConfig {
            seed: Some(42),
            default_rank: 2,
            ..Default::default()
        };
        RankingEngine::new(Arc::new(index), config)
    }

    #[test]
    fn test_lexical_ranking() {
        let engine = engine();
        let hits = engine
            .search_lexical("install python", 3, &Boosts::new(), &Filters::new())
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].doc_index, 0);
        assert_eq!(hits[1].doc_index, 2);
        assert_eq!(hits[2].score, 0.0);
    }

    #[test]
    fn test_zero_boost_removes_field() {
        let engine = engine();
        let mut boost = Boosts::new();
        boost.insert("question".to_string(), 0.0);
        let boosted = engine
            .search_lexical("python", 3, &boost, &Filters::new())
            .unwrap();

        let text_only = {
            let text = engine.index().field("text").unwrap();
            let q = text.transform("python").unwrap();
            let (q_row, q_norm) = (q.as_row(), q.as_row().norm());
            (0..3)
                .map(|i| cosine_sparse(&text.matrix().row(i), text.row_norms()[i], &q_row, q_norm))
                .collect::<Vec<_>>()
        };
        for hit in boosted {
            assert!((hit.score - text_only[hit.doc_index]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_boosts() {
        let engine = engine();
        let mut boost = Boosts::new();
        let run = |boost: &Boosts| engine.search_lexical("python", 3, boost, &Filters::new());

        boost.insert("title".to_string(), 2.0);
        assert!(run(&boost).unwrap_err().is_invalid_parameter());

        let mut boost = Boosts::new();
        boost.insert("text".to_string(), -1.0);
        assert!(run(&boost).unwrap_err().is_invalid_parameter());

        boost.insert("text".to_string(), f64::NAN);
        assert!(run(&boost).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_filters_exclude_records() {
        let engine = engine();
        let mut filters = Filters::new();
        filters.insert("course".to_string(), "B".to_string());
        for strategy in [
            Strategy::Lexical,
            Strategy::LinearFactorization,
            Strategy::NonNegativeFactorization,
        ] {
            let mut request = SearchRequest::new(strategy, "install python").with_k(3);
            request.filters = filters.clone();
            let results = engine.search(&request).unwrap();
            assert_eq!(results.doc_indices(), vec![1], "{strategy}");
        }
    }

    #[test]
    fn test_k_zero() {
        let engine = engine();
        for strategy in Strategy::ALL {
            let request = SearchRequest::new(strategy, "python").with_k(0);
            let err = engine.search(&request).unwrap_err();
            assert!(matches!(err, StrataError::InvalidResultCount(0)));
        }
    }

    #[test]
    fn test_latent_strategies() {
        let engine = engine();
        let request = SearchRequest::new(Strategy::LinearFactorization, "python tutorial")
            .with_field("text")
            .with_rank(2)
            .with_k(10);
        let results = engine.search(&request).unwrap();
        assert_eq!(results.total_results, 3);
        assert!(results.hits.windows(2).all(|w| w[0].score >= w[1].score));

        let request = SearchRequest::new(Strategy::NonNegativeFactorization, "python tutorial");
        let results = engine.search(&request).unwrap();
        assert_eq!(results.total_results, 3);
        assert!(results.hits.iter().all(|h| h.score >= 0.0));
    }

    #[test]
    fn test_latent_errors() {
        let engine = engine();
        let err = engine
            .search_svd("python", 3, "section", 2, &Filters::new())
            .unwrap_err();
        assert!(matches!(err, StrataError::UnknownField(_)));

        let err = engine
            .search_nmf("python", 3, "text", 0, &Filters::new())
            .unwrap_err();
        assert!(matches!(err, StrataError::InvalidRank { .. }));
    }

    #[test]
    fn test_embedding_unavailable() {
        let engine = engine();
        assert!(!engine.available_strategies().contains(&Strategy::Embedding));
        assert_eq!(engine.available_strategies().len(), 3);

        let err = engine
            .search(&SearchRequest::new(Strategy::Embedding, "python"))
            .unwrap_err();
        assert!(matches!(err, StrataError::StrategyUnavailable(_)));

        let engine = engine.with_embeddings(Arc::new(EmbeddingStore::uninitialized(None, vec![])));
        assert!(!engine.is_available(Strategy::Embedding));
    }

    #[test]
    fn test_categories_and_defaults() {
        let engine = engine();
        assert_eq!(engine.available_categories("course"), vec!["A", "B"]);
        assert_eq!(engine.default_field(), "text");
        assert!(engine.with_default_field("answer").is_err());
    }
}
