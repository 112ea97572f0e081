//! The search service: configuration, lifecycle and dispatch.
//!
//! [`SearchService`] is what a front end talks to. It owns the
//! configuration and the optional text encoder, builds a fresh
//! [`RankingEngine`] whenever a corpus is fitted, and hands out
//! `Arc<RankingEngine>` snapshots so in-flight searches are never disturbed
//! by a concurrent refit.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::corpus::Record;
use crate::embedding::{EmbeddingStore, TextEncoder};
use crate::error::{Result, StrataError};
use crate::index::corpus_index::CorpusIndex;
use crate::search::{RankingEngine, SearchRequest, SearchResults, Strategy, StrategyInfo};

/// Owns the current engine.
pub struct SearchService {
    config: EngineConfig,
    encoder: Option<Arc<dyn TextEncoder>>,
    engine: RwLock<Option<Arc<RankingEngine>>>,
}

impl fmt::Debug for SearchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchService")
            .field("config", &self.config)
            .field("encoder", &self.encoder.as_ref().map(|e| e.name().to_string()))
            .field("fitted", &self.is_fitted())
            .finish()
    }
}

impl SearchService {
    /// Create a service with no corpus.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(SearchService {
            config,
            encoder: None,
            engine: RwLock::new(None),
        })
    }

    /// Use `encoder` for the embedding strategy.
    pub fn with_encoder(mut self, encoder: Arc<dyn TextEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Index `records`, replacing any previous corpus.
    ///
    /// Embeddings belong to a corpus, so they have to be initialized again
    /// after every fit.
    pub fn fit(&self, records: Vec<Record>) -> Result<()> {
        let index = CorpusIndex::build(records, &self.config.text_fields, &self.config.weighting)?;
        let engine = RankingEngine::new(Arc::new(index), self.config.factorization.clone())
            .with_default_field(self.config.default_field.clone())?;
        *self.engine.write() = Some(Arc::new(engine));
        Ok(())
    }

    /// Whether a corpus has been fitted.
    pub fn is_fitted(&self) -> bool {
        self.engine.read().is_some()
    }

    /// Snapshot of the current engine.
    pub fn engine(&self) -> Result<Arc<RankingEngine>> {
        self.engine
            .read()
            .clone()
            .ok_or_else(|| StrataError::not_ready("no corpus has been indexed yet"))
    }

    /// Load the embedding cache for the current corpus, or encode the corpus
    /// and write it.
    ///
    /// Returns `Ok(false)` without touching the engine when no encoder is
    /// configured; the embedding strategy then stays unavailable.
    pub fn load_or_create_embeddings(&self) -> Result<bool> {
        self.load_or_create_embeddings_cancellable(&AtomicBool::new(false))
    }

    /// [`load_or_create_embeddings`](Self::load_or_create_embeddings) with an
    /// abort flag checked between encoding batches.
    pub fn load_or_create_embeddings_cancellable(&self, cancel: &AtomicBool) -> Result<bool> {
        let current = self.engine()?;
        let Some(encoder) = self.encoder.clone() else {
            warn!("No text encoder configured; embedding strategy disabled");
            return Ok(false);
        };

        let settings = &self.config.embeddings;
        let mut store =
            EmbeddingStore::uninitialized(Some(encoder), self.config.text_fields.clone())
                .with_batch_size(settings.batch_size);
        store.load_or_create_cancellable(
            &settings.cache_path,
            current.index().records(),
            cancel,
        )?;

        let factorization = self.config.factorization.clone();
        let engine = RankingEngine::new(Arc::clone(current.index()), factorization)
            .with_default_field(self.config.default_field.clone())?
            .with_embeddings(Arc::new(store));

        let mut slot = self.engine.write();
        // a concurrent fit replaced the corpus; these embeddings are stale
        if !slot.as_ref().is_some_and(|e| Arc::ptr_eq(e.index(), current.index())) {
            return Err(StrataError::cancelled("corpus changed while embeddings were prepared"));
        }
        *slot = Some(Arc::new(engine));
        info!("Embedding strategy enabled");
        Ok(true)
    }

    /// Run a request against the current engine.
    ///
    /// # Errors
    ///
    /// [`StrataError::NotReady`] before the first [`fit`](Self::fit), and
    /// [`StrataError::InvalidParameter`] for a blank query, plus everything
    /// [`RankingEngine::search`] reports.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let engine = self.engine()?;
        if request.query.trim().is_empty() {
            return Err(StrataError::invalid_parameter("query must not be empty"));
        }
        engine.search(request)
    }

    /// Strategies that can run now; empty before the first fit.
    pub fn available_strategies(&self) -> BTreeSet<Strategy> {
        self.engine
            .read()
            .as_ref()
            .map(|e| e.available_strategies())
            .unwrap_or_default()
    }

    /// Descriptors of the strategies that can run now.
    pub fn strategy_infos(&self) -> Vec<StrategyInfo> {
        self.available_strategies()
            .into_iter()
            .map(|s| s.info())
            .collect()
    }

    /// Distinct values of the configured category field, in order of first
    /// appearance; empty before the first fit.
    pub fn available_categories(&self) -> Vec<String> {
        self.engine
            .read()
            .as_ref()
            .map(|e| e.available_categories(&self.config.category_field))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightingConfig;

    struct CountingEncoder;

    impl TextEncoder for CountingEncoder {
        fn encode(&self, text: &str) -> Result<Vec<f32>> {
            let words = text.split_whitespace().count() as f32;
            let python = text.matches("python").count() as f32;
            Ok(vec![words, python, 1.0])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn config(dir: &std::path::Path) -> EngineConfig {
        let mut config = EngineConfig {
            text_fields: vec!["question".to_string(), "text".to_string()],
            weighting: WeightingConfig::default(),
            ..Default::default()
        };
        config.embeddings.cache_path = dir.join("embeddings.bin");
        config.factorization.seed = Some(1);
        config.factorization.default_rank = 2;
        config
    }

    fn records() -> Vec<Record> {
        vec![
            Record::from_pairs([
                ("question", "install"),
                ("text", "python install guide"),
                ("course", "A"),
            ]),
            Record::from_pairs([
                ("question", "setup"),
                ("text", "java setup tutorial"),
                ("course", "B"),
            ]),
        ]
    }

    #[test]
    fn test_not_ready_before_fit() {
        let dir = tempfile::tempdir().unwrap();
        let service = SearchService::new(config(dir.path())).unwrap();
        let err = service
            .search(&SearchRequest::new(Strategy::Lexical, "python"))
            .unwrap_err();
        assert!(matches!(err, StrataError::NotReady(_)));
        assert!(service.available_strategies().is_empty());
        assert!(service.available_categories().is_empty());
        assert!(service.load_or_create_embeddings().is_err());
    }

    #[test]
    fn test_fit_and_search() {
        let dir = tempfile::tempdir().unwrap();
        let service = SearchService::new(config(dir.path())).unwrap();
        service.fit(records()).unwrap();

        let results = service
            .search(&SearchRequest::new(Strategy::Lexical, "How do I install Python").with_k(1))
            .unwrap();
        assert_eq!(results.doc_indices(), vec![0]);
        assert_eq!(service.available_categories(), vec!["A", "B"]);
        assert_eq!(service.available_strategies().len(), 3);

        let blank = service.search(&SearchRequest::new(Strategy::Lexical, "  "));
        assert!(blank.unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_embeddings_without_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let service = SearchService::new(config(dir.path())).unwrap();
        service.fit(records()).unwrap();
        assert!(!service.load_or_create_embeddings().unwrap());
        assert!(!service.available_strategies().contains(&Strategy::Embedding));
    }

    #[test]
    fn test_embeddings_enable_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let service = SearchService::new(config(dir.path()))
            .unwrap()
            .with_encoder(Arc::new(CountingEncoder));
        service.fit(records()).unwrap();
        assert!(service.load_or_create_embeddings().unwrap());
        assert!(service.available_strategies().contains(&Strategy::Embedding));
        assert!(dir.path().join("embeddings.bin").exists());

        let results = service
            .search(&SearchRequest::new(Strategy::Embedding, "python python").with_k(2))
            .unwrap();
        assert_eq!(results.total_results, 2);
        assert_eq!(results.hits[0].doc_index, 0);

        // refitting drops the embeddings until they are initialized again
        service.fit(records()).unwrap();
        assert!(!service.available_strategies().contains(&Strategy::Embedding));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            default_results: 0,
            ..Default::default()
        };
        assert!(SearchService::new(config).unwrap_err().is_configuration());
    }
}
