//! Corpus index: per-field term-weight matrices and their fitted models.

pub mod corpus_index;
pub mod sparse;
pub mod vectorizer;

pub use corpus_index::{CorpusIndex, FieldRepresentation};
