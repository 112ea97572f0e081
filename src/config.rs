//! Engine configuration.
//!
//! Every struct here deserializes from JSON with all fields optional, so a
//! config file only needs to name what it overrides:
//!
//! ```
//! use strata::config::EngineConfig;
//!
//! let config: EngineConfig = serde_json::from_str(
//!     r#"{ "text_fields": ["question", "text"], "factorization": { "seed": 7 } }"#,
//! ).unwrap();
//! assert_eq!(config.text_fields, vec!["question", "text"]);
//! assert_eq!(config.weighting.min_df, 3);
//! assert_eq!(config.factorization.seed, Some(7));
//! assert_eq!(config.factorization.default_rank, 16);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::regex::DEFAULT_TOKEN_PATTERN;
use crate::error::{Result, StrataError};

/// Stop-word policy applied by every field's analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopWords {
    /// The built-in English list.
    #[default]
    English,
    /// No stop-word removal.
    None,
    /// A caller-supplied list.
    Custom(Vec<String>),
}

/// Term weighting configuration shared by all indexed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    /// Stop-word policy.
    pub stop_words: StopWords,
    /// Minimum number of records a term must occur in to enter the vocabulary.
    pub min_df: usize,
    /// Regular expression whose matches are the raw tokens.
    pub token_pattern: String,
    /// Whether tokens are lowercased before weighting.
    pub lowercase: bool,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            stop_words: StopWords::English,
            min_df: 1,
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            lowercase: true,
        }
    }
}

impl WeightingConfig {
    /// Effective document-frequency threshold (`0` behaves like `1`).
    pub fn effective_min_df(&self) -> usize {
        self.min_df.max(1)
    }
}

/// Configuration for the latent factorization strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorizationConfig {
    /// Rank used when a request does not name one.
    pub default_rank: usize,
    /// Extra random directions sampled by the truncated SVD range finder.
    pub oversamples: usize,
    /// Power iterations run by the truncated SVD range finder.
    pub power_iterations: usize,
    /// Maximum multiplicative-update iterations for NMF.
    pub max_iter: usize,
    /// Relative error improvement below which NMF stops.
    pub tol: f64,
    /// Seed for factorization initialization. `None` seeds NMF from OS
    /// entropy, so repeated NMF fits differ.
    pub seed: Option<u64>,
    /// Reuse fitted projections per (field, rank, mode).
    pub cache: bool,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            default_rank: 16,
            oversamples: 10,
            power_iterations: 5,
            max_iter: 200,
            tol: 1e-4,
            seed: None,
            cache: true,
        }
    }
}

/// Configuration for the semantic embedding store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Location of the embedding cache artifact.
    pub cache_path: PathBuf,
    /// Encoder model identifier.
    pub model: String,
    /// Number of records encoded per batch.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("embeddings.bin"),
            model: "bert-base-uncased".to_string(),
            batch_size: 32,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Text fields indexed for every record, in combination order.
    pub text_fields: Vec<String>,
    /// Term weighting for every text field.
    pub weighting: WeightingConfig,
    /// Latent factorization settings.
    pub factorization: FactorizationConfig,
    /// Embedding store settings.
    pub embeddings: EmbeddingConfig,
    /// Metadata field whose distinct values are offered as filters.
    pub category_field: String,
    /// Field scored by single-field strategies when a request names none.
    pub default_field: String,
    /// Result count used when a request names none.
    pub default_results: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            text_fields: vec![
                "section".to_string(),
                "question".to_string(),
                "text".to_string(),
            ],
            weighting: WeightingConfig {
                min_df: 3,
                ..WeightingConfig::default()
            },
            factorization: FactorizationConfig::default(),
            embeddings: EmbeddingConfig::default(),
            category_field: "course".to_string(),
            default_field: "text".to_string(),
            default_results: 10,
        }
    }
}

impl EngineConfig {
    /// Read a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no index can be built from.
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.text_fields)?;

        if !self.text_fields.contains(&self.default_field) {
            return Err(StrataError::configuration(format!(
                "default field '{}' is not one of the text fields",
                self.default_field
            )));
        }
        if self.default_results == 0 {
            return Err(StrataError::configuration(
                "default_results must be at least 1",
            ));
        }
        if self.factorization.default_rank == 0 {
            return Err(StrataError::configuration(
                "factorization.default_rank must be at least 1",
            ));
        }
        if !(self.factorization.tol.is_finite() && self.factorization.tol >= 0.0) {
            return Err(StrataError::configuration(
                "factorization.tol must be a non-negative number",
            ));
        }
        if self.embeddings.batch_size == 0 {
            return Err(StrataError::configuration(
                "embeddings.batch_size must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Reject empty or duplicated text field lists.
pub(crate) fn validate_fields(fields: &[String]) -> Result<()> {
    if fields.is_empty() {
        return Err(StrataError::configuration(
            "at least one text field is required",
        ));
    }
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.as_str()) {
            return Err(StrataError::configuration(format!(
                "text field '{field}' is configured more than once"
            )));
        }
    }
    Ok(())
}
