//! The corpus embedding matrix and its lifecycle.
//!
//! A store starts uninitialized. It becomes usable either by loading a cache
//! artifact that matches the current corpus, or by encoding the corpus and
//! writing a fresh artifact. Creation is all-or-nothing: a failed or aborted
//! run leaves neither a matrix nor an artifact behind.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::corpus::Record;
use crate::embedding::cache::{self, CacheBody};
use crate::embedding::encoder::TextEncoder;
use crate::error::{Result, StrataError};
use crate::similarity::cosine;

const DEFAULT_BATCH_SIZE: usize = 32;

/// Dense `rows × dim` matrix of `f32`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Vector length.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Row `i`.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// All values, row-major.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Holds one semantic vector per corpus record.
pub struct EmbeddingStore {
    encoder: Option<Arc<dyn TextEncoder>>,
    fields: Vec<String>,
    batch_size: usize,
    matrix: Option<EmbeddingMatrix>,
}

impl fmt::Debug for EmbeddingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingStore")
            .field("encoder", &self.encoder.as_ref().map(|e| e.name().to_string()))
            .field("fields", &self.fields)
            .field("batch_size", &self.batch_size)
            .field("rows", &self.matrix.as_ref().map(EmbeddingMatrix::rows))
            .finish()
    }
}

impl EmbeddingStore {
    /// A store with no matrix yet.
    ///
    /// `fields` are the text fields whose combined text is encoded per
    /// record, in combination order.
    pub fn uninitialized(encoder: Option<Arc<dyn TextEncoder>>, fields: Vec<String>) -> Self {
        EmbeddingStore {
            encoder,
            fields,
            batch_size: DEFAULT_BATCH_SIZE,
            matrix: None,
        }
    }

    /// Set the number of records encoded per batch (at least one).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Encode `corpus` and persist the result at `path`.
    pub fn create<P: AsRef<Path>>(
        corpus: &[Record],
        fields: Vec<String>,
        encoder: Option<Arc<dyn TextEncoder>>,
        path: P,
    ) -> Result<Self> {
        Self::create_cancellable(corpus, fields, encoder, path, &AtomicBool::new(false))
    }

    /// Like [`create`](Self::create), but gives up with
    /// [`StrataError::OperationCancelled`] once `cancel` is set. The flag is
    /// checked between batches.
    pub fn create_cancellable<P: AsRef<Path>>(
        corpus: &[Record],
        fields: Vec<String>,
        encoder: Option<Arc<dyn TextEncoder>>,
        path: P,
        cancel: &AtomicBool,
    ) -> Result<Self> {
        let mut store = Self::uninitialized(encoder, fields);
        store.build(corpus, path.as_ref(), cancel)?;
        Ok(store)
    }

    /// Try to adopt the artifact at `path` for `corpus`.
    ///
    /// Returns `false`, leaving the store unchanged, when the file is absent,
    /// unreadable or corrupt, or was computed for a different corpus.
    pub fn load<P: AsRef<Path>>(&mut self, path: P, corpus: &[Record]) -> bool {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No embedding cache found");
            return false;
        }

        let body = match cache::read(path) {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable embedding cache");
                return false;
            }
        };

        if body.rows != corpus.len() as u64 {
            warn!(
                path = %path.display(),
                cached = body.rows,
                corpus = corpus.len(),
                "Ignoring embedding cache with a different record count"
            );
            return false;
        }
        if body.fingerprint != self.fingerprint(corpus) {
            warn!(path = %path.display(), "Ignoring embedding cache built from a different corpus");
            return false;
        }
        if let Some(encoder) = &self.encoder {
            if body.dim as usize != encoder.dimension() {
                warn!(
                    path = %path.display(),
                    cached = body.dim,
                    encoder = encoder.dimension(),
                    "Ignoring embedding cache with a different dimension"
                );
                return false;
            }
        }

        info!(path = %path.display(), rows = body.rows, dim = body.dim, "Loaded embedding cache");
        self.matrix = Some(EmbeddingMatrix {
            rows: body.rows as usize,
            dim: body.dim as usize,
            data: body.data,
        });
        true
    }

    /// Load the artifact at `path`, or create it when it cannot be used.
    pub fn load_or_create<P: AsRef<Path>>(&mut self, path: P, corpus: &[Record]) -> Result<()> {
        self.load_or_create_cancellable(path, corpus, &AtomicBool::new(false))
    }

    /// [`load_or_create`](Self::load_or_create) with an abort flag.
    pub fn load_or_create_cancellable<P: AsRef<Path>>(
        &mut self,
        path: P,
        corpus: &[Record],
        cancel: &AtomicBool,
    ) -> Result<()> {
        let path = path.as_ref();
        if self.load(path, corpus) {
            return Ok(());
        }
        self.build(corpus, path, cancel)
    }

    fn build(&mut self, corpus: &[Record], path: &Path, cancel: &AtomicBool) -> Result<()> {
        let encoder = self
            .encoder
            .clone()
            .ok_or(StrataError::EncoderUnavailable)?;
        let dim = encoder.dimension();
        let texts: Vec<String> = corpus
            .iter()
            .map(|r| r.combined_text(&self.fields))
            .collect();

        info!(
            records = texts.len(),
            model = encoder.name(),
            batch_size = self.batch_size,
            "Creating embeddings"
        );
        let start = Instant::now();

        let mut data = Vec::with_capacity(texts.len() * dim);
        for (batch_no, batch) in texts.chunks(self.batch_size).enumerate() {
            let done = batch_no * self.batch_size;
            if cancel.load(Ordering::Relaxed) {
                return Err(StrataError::cancelled(format!(
                    "embedding creation stopped after {done} of {} records",
                    texts.len()
                )));
            }

            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            let vectors = encoder.encode_batch(&refs)?;
            if vectors.len() != batch.len() {
                return Err(StrataError::encoding(format!(
                    "encoder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            for vector in vectors {
                check_dimension(&vector, dim)?;
                data.extend_from_slice(&vector);
            }
            info!(encoded = done + batch.len(), total = texts.len(), "Embedding progress");
        }

        let body = CacheBody {
            rows: texts.len() as u64,
            dim: dim as u64,
            fingerprint: cache::fingerprint(texts.iter().map(String::as_str)),
            data,
        };
        cache::write(path, &body)?;

        info!(
            path = %path.display(),
            rows = body.rows,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Saved embedding cache"
        );
        self.matrix = Some(EmbeddingMatrix {
            rows: texts.len(),
            dim,
            data: body.data,
        });
        Ok(())
    }

    /// Encode query text with the store's encoder.
    pub fn encode_query(&self, text: &str) -> Result<Vec<f32>> {
        let encoder = self.encoder.as_ref().ok_or(StrataError::EncoderUnavailable)?;
        let vector = encoder.encode(text)?;
        check_dimension(&vector, encoder.dimension())?;
        Ok(vector)
    }

    /// Cosine similarity of every row against `query`.
    pub fn scores(&self, query: &[f32]) -> Result<Vec<f64>> {
        let matrix = self
            .matrix
            .as_ref()
            .ok_or_else(|| StrataError::StrategyUnavailable("embedding".to_string()))?;
        check_dimension(query, matrix.dim)?;
        Ok((0..matrix.rows)
            .into_par_iter()
            .map(|i| cosine(matrix.row(i), query))
            .collect())
    }

    /// Whether both a matrix and an encoder are present.
    pub fn is_ready(&self) -> bool {
        self.matrix.is_some() && self.encoder.is_some()
    }

    /// Number of embedded records (zero when uninitialized).
    pub fn len(&self) -> usize {
        self.matrix.as_ref().map_or(0, EmbeddingMatrix::rows)
    }

    /// Whether no record is embedded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector length, from the matrix or else the encoder.
    pub fn dimension(&self) -> Option<usize> {
        self.matrix
            .as_ref()
            .map(EmbeddingMatrix::dim)
            .or_else(|| self.encoder.as_ref().map(|e| e.dimension()))
    }

    /// The corpus matrix, if initialized.
    pub fn matrix(&self) -> Option<&EmbeddingMatrix> {
        self.matrix.as_ref()
    }

    /// Text fields combined per record.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    fn fingerprint(&self, corpus: &[Record]) -> u32 {
        let texts: Vec<String> = corpus
            .iter()
            .map(|r| r.combined_text(&self.fields))
            .collect();
        cache::fingerprint(texts.iter().map(String::as_str))
    }
}

fn check_dimension(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(StrataError::encoding(format!(
            "expected a vector of length {expected}, got {}",
            vector.len()
        )));
    }
    Ok(())
}
