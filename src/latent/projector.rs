//! Fitted latent projections and their per-(field, rank, mode) cache.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use ndarray::Array2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FactorizationConfig;
use crate::error::{Result, StrataError};
use crate::index::corpus_index::{CorpusIndex, FieldRepresentation};
use crate::index::sparse::SparseVector;
use crate::latent::nmf::{Nmf, NmfParams};
use crate::latent::svd::TruncatedSvd;
use crate::similarity::{cosine_rows, row_norms};

/// Seed for the SVD range finder when none is configured. The SVD is always
/// seeded so linear projections are reproducible across processes.
const DEFAULT_SVD_SEED: u64 = 42;

/// Which factorization a projection uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorizationMode {
    /// Truncated SVD.
    Linear,
    /// Non-negative matrix factorization.
    NonNegative,
}

impl FactorizationMode {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            FactorizationMode::Linear => "svd",
            FactorizationMode::NonNegative => "nmf",
        }
    }
}

impl fmt::Display for FactorizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
enum LatentModel {
    Linear(TruncatedSvd),
    NonNegative(Nmf),
}

/// A field's term-weight matrix reduced to `rank` dimensions, together with
/// the model that maps queries into the same space.
#[derive(Debug)]
pub struct LatentProjection {
    field: String,
    rank: usize,
    mode: FactorizationMode,
    embedding: Array2<f64>,
    row_norms: Vec<f64>,
    model: LatentModel,
}

impl LatentProjection {
    /// Field the projection was fitted on.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Number of latent dimensions.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Factorization used.
    pub fn mode(&self) -> FactorizationMode {
        self.mode
    }

    /// Corpus embedding, `|corpus| × rank`, row-aligned with the corpus.
    pub fn embedding(&self) -> &Array2<f64> {
        &self.embedding
    }

    /// Map a term-weight vector of the same field into the latent space.
    pub fn transform(&self, query: &SparseVector) -> ndarray::Array1<f64> {
        match &self.model {
            LatentModel::Linear(svd) => svd.transform(&query.as_row()),
            LatentModel::NonNegative(nmf) => nmf.transform(&query.as_row()),
        }
    }

    /// Cosine similarity of every corpus row against a term-weight query.
    pub fn scores(&self, query: &SparseVector) -> Vec<f64> {
        let projected = self.transform(query);
        cosine_rows(self.embedding.view(), &self.row_norms, projected.view())
    }
}

type ProjectionKey = (String, usize, FactorizationMode);
type ProjectionSlot = Arc<Mutex<Option<Arc<LatentProjection>>>>;

/// Fits latent projections on demand.
///
/// With caching enabled every (field, rank, mode) combination is fitted at
/// most once per index. Concurrent callers asking for the same key wait on
/// that key's slot while other keys proceed.
pub struct LatentProjector {
    index: Arc<CorpusIndex>,
    config: FactorizationConfig,
    cache: Mutex<AHashMap<ProjectionKey, ProjectionSlot>>,
}

impl fmt::Debug for LatentProjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatentProjector")
            .field("records", &self.index.len())
            .field("config", &self.config)
            .field("cached", &self.cached_projections())
            .finish()
    }
}

impl LatentProjector {
    /// Create a projector over an index.
    pub fn new(index: Arc<CorpusIndex>, config: FactorizationConfig) -> Self {
        LatentProjector {
            index,
            config,
            cache: Mutex::new(AHashMap::new()),
        }
    }

    /// The underlying index.
    pub fn index(&self) -> &Arc<CorpusIndex> {
        &self.index
    }

    /// Factorization settings.
    pub fn config(&self) -> &FactorizationConfig {
        &self.config
    }

    /// Get the projection of `field` at `rank`, fitting it if needed.
    ///
    /// # Errors
    ///
    /// - [`StrataError::UnknownField`] if `field` is not indexed
    /// - [`StrataError::InvalidRank`] unless `1 <= rank <= |vocabulary|`
    pub fn project(
        &self,
        field: &str,
        rank: usize,
        mode: FactorizationMode,
    ) -> Result<Arc<LatentProjection>> {
        let representation = self.index.field(field)?;
        let vocabulary_size = representation.vocabulary_size();
        if rank == 0 || rank > vocabulary_size {
            return Err(StrataError::InvalidRank {
                field: field.to_string(),
                rank,
                vocabulary_size,
            });
        }

        if !self.config.cache {
            return self.fit(representation, rank, mode).map(Arc::new);
        }

        let slot = {
            let mut cache = self.cache.lock();
            Arc::clone(
                cache
                    .entry((field.to_string(), rank, mode))
                    .or_default(),
            )
        };

        let mut guard = slot.lock();
        if let Some(projection) = guard.as_ref() {
            debug!(field, rank, %mode, "Latent projection cache hit");
            return Ok(Arc::clone(projection));
        }
        let projection = Arc::new(self.fit(representation, rank, mode)?);
        *guard = Some(Arc::clone(&projection));
        Ok(projection)
    }

    /// Number of fitted projections held in the cache.
    pub fn cached_projections(&self) -> usize {
        self.cache
            .lock()
            .values()
            .filter(|slot| slot.lock().is_some())
            .count()
    }

    /// Drop every cached projection.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    fn fit(
        &self,
        representation: &FieldRepresentation,
        rank: usize,
        mode: FactorizationMode,
    ) -> Result<LatentProjection> {
        let start = Instant::now();
        let matrix = representation.matrix();
        let (embedding, model) = match mode {
            FactorizationMode::Linear => {
                let svd = TruncatedSvd::fit(
                    matrix,
                    rank,
                    self.config.oversamples,
                    self.config.power_iterations,
                    self.config.seed.unwrap_or(DEFAULT_SVD_SEED),
                );
                (svd.transform_matrix(matrix), LatentModel::Linear(svd))
            }
            FactorizationMode::NonNegative => {
                let params = NmfParams {
                    max_iter: self.config.max_iter,
                    tol: self.config.tol,
                };
                let (nmf, w) = Nmf::fit(matrix, rank, params, self.config.seed)?;
                (w, LatentModel::NonNegative(nmf))
            }
        };

        info!(
            field = representation.name(),
            rank,
            %mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted latent projection"
        );

        Ok(LatentProjection {
            field: representation.name().to_string(),
            rank,
            mode,
            row_norms: row_norms(embedding.view()),
            embedding,
            model,
        })
    }
}
