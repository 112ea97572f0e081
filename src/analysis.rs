//! Text analysis for term weighting.
//!
//! Raw field text flows through an [`analyzer::Analyzer`], which runs a
//! [`tokenizer::Tokenizer`] followed by a chain of [`token_filter::Filter`]s.
//! The resulting terms feed the TF-IDF vectorizer of every indexed field and
//! the query transform for that field.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;
