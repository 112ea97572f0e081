//! Error types for the Strata library.
//!
//! All fallible operations return [`Result`], whose error type is
//! [`StrataError`]. Variants fall into the groups a caller usually needs to
//! tell apart:
//!
//! - configuration problems surfaced while building an index
//!   ([`StrataError::is_configuration`]),
//! - bad call parameters rejected before any scoring
//!   ([`StrataError::is_invalid_parameter`]),
//! - strategies that exist but cannot run right now
//!   ([`StrataError::StrategyUnavailable`], [`StrataError::NotReady`]),
//! - encoder failures while building or querying embeddings.
//!
//! # Examples
//!
//! ```
//! use strata::error::{Result, StrataError};
//!
//! fn top(k: usize) -> Result<usize> {
//!     if k == 0 {
//!         return Err(StrataError::InvalidResultCount(k));
//!     }
//!     Ok(k)
//! }
//!
//! let err = top(0).unwrap_err();
//! assert!(err.is_invalid_parameter());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Strata operations.
#[derive(Error, Debug)]
pub enum StrataError {
    /// The corpus handed to the index has no records.
    #[error("Configuration error: corpus is empty")]
    EmptyCorpus,

    /// A configured text field is absent from a record.
    #[error("Configuration error: field '{field}' is missing from record {record}")]
    MissingField { field: String, record: usize },

    /// Invalid field or weighting configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A ranking call was made before any corpus was indexed.
    #[error("Engine not ready: {0}")]
    NotReady(String),

    /// Requested result count is not positive.
    #[error("Invalid parameter: result count must be at least 1, got {0}")]
    InvalidResultCount(usize),

    /// Requested rank is out of range for the field.
    #[error("Invalid parameter: rank {rank} for field '{field}' must be in 1..={vocabulary_size}")]
    InvalidRank {
        field: String,
        rank: usize,
        vocabulary_size: usize,
    },

    /// A field selector names a field that is not indexed.
    #[error("Invalid parameter: field '{0}' is not an indexed text field")]
    UnknownField(String),

    /// A strategy name that does not map to any strategy.
    #[error("Invalid parameter: unknown strategy '{0}'")]
    UnknownStrategy(String),

    /// Any other rejected call parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The strategy exists but cannot run in the current state.
    #[error("Strategy '{0}' is not available")]
    StrategyUnavailable(String),

    /// No semantic encoder is configured.
    #[error("No semantic encoder is available")]
    EncoderUnavailable,

    /// The semantic encoder failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Operation cancelled
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Binary (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with StrataError.
pub type Result<T> = std::result::Result<T, StrataError>;

impl StrataError {
    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        StrataError::Configuration(msg.into())
    }

    /// Create a new invalid parameter error.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        StrataError::InvalidParameter(msg.into())
    }

    /// Create a new encoding error.
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        StrataError::Encoding(msg.into())
    }

    /// Create a new not-ready error.
    pub fn not_ready<S: Into<String>>(msg: S) -> Self {
        StrataError::NotReady(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        StrataError::Serialization(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        StrataError::OperationCancelled(msg.into())
    }

    /// Whether this error comes from invalid index construction input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StrataError::EmptyCorpus
                | StrataError::MissingField { .. }
                | StrataError::Configuration(_)
        )
    }

    /// Whether this error rejects call parameters before any computation.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            StrataError::InvalidResultCount(_)
                | StrataError::InvalidRank { .. }
                | StrataError::UnknownField(_)
                | StrataError::UnknownStrategy(_)
                | StrataError::InvalidParameter(_)
        )
    }
}
