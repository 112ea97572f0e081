//! Analyzers turn raw text into the terms that get weighted.
//!
//! ```text
//! Raw Text → Tokenizer → Filter 1 → ... → Filter N → terms
//! ```
//!
//! # Examples
//!
//! ```
//! use strata::analysis::analyzer::Analyzer;
//! use strata::analysis::analyzer::standard::StandardAnalyzer;
//!
//! let analyzer = StandardAnalyzer::new().unwrap();
//! let terms = analyzer.terms("How do I install Python?").unwrap();
//! assert_eq!(terms, vec!["install", "python"]);
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod pipeline;
pub mod standard;

/// Trait for analyzers that convert text into processed tokens.
///
/// Analyzers are shared between the fitting pass and every query transform,
/// so they must be `Send + Sync`.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    fn name(&self) -> &str;

    /// Collect the term texts produced for `text`, in stream order.
    fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyze(text)?.map(|token| token.text).collect())
    }
}
