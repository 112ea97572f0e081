//! Token filters transform token streams produced by tokenizers.
//!
//! ```text
//! Tokenizer → Lowercase → Stop Words → Vectorizer
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod lowercase;
pub mod stop;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}
