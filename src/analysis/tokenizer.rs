//! Tokenizers split raw text into tokens.
//!
//! Only the regex tokenizer is needed for term weighting; the trait stays
//! open so a caller can plug in a different splitting rule through a custom
//! [`PipelineAnalyzer`](crate::analysis::analyzer::pipeline::PipelineAnalyzer).

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod regex;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}
