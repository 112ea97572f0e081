//! Standard analyzer used for term weighting.
//!
//! # Pipeline
//!
//! 1. RegexTokenizer (`\b\w\w+\b` unless configured otherwise)
//! 2. LowercaseFilter (optional)
//! 3. StopFilter (English, custom, or none)

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::config::{StopWords, WeightingConfig};
use crate::error::Result;

/// Analyzer built from a [`WeightingConfig`].
#[derive(Clone, Debug)]
pub struct StandardAnalyzer {
    inner: PipelineAnalyzer,
}

impl StandardAnalyzer {
    /// Default pattern, lowercasing and English stop words.
    pub fn new() -> Result<Self> {
        Self::from_config(&WeightingConfig::default())
    }

    /// Build the analyzer described by a weighting configuration.
    pub fn from_config(config: &WeightingConfig) -> Result<Self> {
        let tokenizer = Arc::new(RegexTokenizer::with_pattern(&config.token_pattern)?);
        let mut analyzer = PipelineAnalyzer::new(tokenizer);

        if config.lowercase {
            analyzer = analyzer.add_filter(Arc::new(LowercaseFilter::new()));
        }

        analyzer = match &config.stop_words {
            StopWords::English => analyzer.add_filter(Arc::new(StopFilter::english())),
            StopWords::Custom(words) => {
                analyzer.add_filter(Arc::new(StopFilter::from_words(words.iter().cloned())))
            }
            StopWords::None => analyzer,
        };

        Ok(StandardAnalyzer {
            inner: analyzer.with_name("standard"),
        })
    }

    /// Get the inner pipeline analyzer.
    pub fn inner(&self) -> &PipelineAnalyzer {
        &self.inner
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &str {
        "standard"
    }
}
