//! The closed set of ranking strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StrataError;

/// A ranking strategy.
///
/// Names parse case-insensitively; each strategy also accepts a few aliases.
///
/// ```
/// use strata::search::Strategy;
///
/// assert_eq!("tfidf".parse::<Strategy>().unwrap(), Strategy::Lexical);
/// assert_eq!("LSA".parse::<Strategy>().unwrap(), Strategy::LinearFactorization);
/// assert!("bm25".parse::<Strategy>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Boosted TF-IDF cosine summed over all text fields.
    #[serde(rename = "tfidf", alias = "lexical")]
    Lexical,
    /// Cosine in a truncated-SVD latent space of one field.
    #[serde(rename = "svd", alias = "lsa", alias = "linear")]
    LinearFactorization,
    /// Cosine in an NMF latent space of one field.
    #[serde(rename = "nmf", alias = "non_negative")]
    NonNegativeFactorization,
    /// Cosine against semantic embeddings of the combined text.
    #[serde(rename = "embedding", alias = "bert", alias = "semantic")]
    Embedding,
}

impl Strategy {
    /// Every strategy, in display order.
    pub const ALL: [Strategy; 4] = [
        Strategy::Lexical,
        Strategy::LinearFactorization,
        Strategy::NonNegativeFactorization,
        Strategy::Embedding,
    ];

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Lexical => "tfidf",
            Strategy::LinearFactorization => "svd",
            Strategy::NonNegativeFactorization => "nmf",
            Strategy::Embedding => "embedding",
        }
    }

    /// Descriptor for the metadata surface.
    pub fn info(&self) -> StrategyInfo {
        let (description, supports_boost) = match self {
            Strategy::Lexical => (
                "TF-IDF cosine similarity summed over all text fields with per-field boosts",
                true,
            ),
            Strategy::LinearFactorization => (
                "Cosine similarity in a truncated SVD latent space of one field",
                false,
            ),
            Strategy::NonNegativeFactorization => (
                "Cosine similarity in a non-negative matrix factorization space of one field",
                false,
            ),
            Strategy::Embedding => (
                "Cosine similarity of semantic embeddings over the combined text fields",
                false,
            ),
        };
        StrategyInfo {
            strategy: *self,
            name: self.name().to_string(),
            description: description.to_string(),
            supports_boost,
            supports_filters: true,
        }
    }

    /// Whether the strategy scores one chosen field.
    pub fn is_single_field(&self) -> bool {
        matches!(
            self,
            Strategy::LinearFactorization | Strategy::NonNegativeFactorization
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tfidf" | "tf-idf" | "lexical" => Ok(Strategy::Lexical),
            "svd" | "lsa" | "linear" => Ok(Strategy::LinearFactorization),
            "nmf" | "non_negative" | "non-negative" => Ok(Strategy::NonNegativeFactorization),
            "embedding" | "embeddings" | "bert" | "semantic" => Ok(Strategy::Embedding),
            _ => Err(StrataError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Describes a strategy to callers choosing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// The strategy.
    pub strategy: Strategy,
    /// Canonical name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Whether per-field boosts affect scoring.
    pub supports_boost: bool,
    /// Whether metadata filters are honored.
    pub supports_filters: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_aliases() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!("BERT".parse::<Strategy>().unwrap(), Strategy::Embedding);
        assert_eq!(
            " non_negative ".parse::<Strategy>().unwrap(),
            Strategy::NonNegativeFactorization
        );
        assert_eq!("lexical".parse::<Strategy>().unwrap(), Strategy::Lexical);
    }

    #[test]
    fn test_unknown_strategy() {
        let err = "bm25".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, StrataError::UnknownStrategy(ref name) if name == "bm25"));
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Strategy::LinearFactorization).unwrap(), "\"svd\"");
        let parsed: Strategy = serde_json::from_str("\"semantic\"").unwrap();
        assert_eq!(parsed, Strategy::Embedding);
    }

    #[test]
    fn test_info() {
        assert!(Strategy::Lexical.info().supports_boost);
        assert!(!Strategy::Embedding.info().supports_boost);
        assert!(Strategy::ALL.iter().all(|s| s.info().supports_filters));
        assert!(Strategy::NonNegativeFactorization.is_single_field());
        assert!(!Strategy::Lexical.is_single_field());
    }
}
