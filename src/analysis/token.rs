//! The unit passed between tokenizers and filters.
//!
//! ```
//! use strata::analysis::token::Token;
//!
//! let text = "install python";
//! let token = Token::with_offsets("python", 1, 8, 14);
//! assert_eq!(&text[token.start_offset..token.end_offset], token.text);
//! ```

use serde::{Deserialize, Serialize};

/// A term with where it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Term text, possibly rewritten by filters.
    pub text: String,
    /// Index in the tokenizer's output, before any filtering.
    pub position: usize,
    /// Byte offset where the match starts in the analyzed text.
    pub start_offset: usize,
    /// Byte offset just past the match.
    pub end_offset: usize,
}

impl Token {
    /// A token without source offsets.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        Self::with_offsets(text, position, 0, 0)
    }

    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
        }
    }
}

/// Tokens flow lazily through the pipeline.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;
