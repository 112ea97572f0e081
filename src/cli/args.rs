//! Command line argument parsing using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::search::Strategy;

/// Strata - multi-strategy document retrieval
#[derive(Parser, Debug, Clone)]
#[command(name = "strata")]
#[command(about = "Rank a JSON corpus with TF-IDF, SVD, NMF or semantic embeddings")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct StrataArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, env = "STRATA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl StrataArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity() {
            0 => "error",
            1 => "warn",
            2 => "info",
            _ => "debug",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rank a corpus against a query
    Search(SearchArgs),

    /// List available strategies and categories
    Methods(MethodsArgs),

    /// Build (or verify) the embedding cache of a corpus
    Embed(EmbedArgs),
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    Human,
    /// JSON
    Json,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Corpus file (JSON)
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Ranking strategy (tfidf, svd, nmf, embedding)
    #[arg(short, long, default_value = "tfidf", value_parser = parse_strategy)]
    pub strategy: Strategy,

    /// Maximum number of results (defaults to the configured count)
    #[arg(short = 'k', long = "limit")]
    pub limit: Option<usize>,

    /// Field boost as FIELD=WEIGHT, repeatable (tfidf only)
    #[arg(short, long = "boost", value_parser = parse_boost)]
    pub boosts: Vec<(String, f64)>,

    /// Metadata filter as FIELD=VALUE, repeatable
    #[arg(short = 'F', long = "filter", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    /// Field scored by svd and nmf
    #[arg(long)]
    pub field: Option<String>,

    /// Latent rank for svd and nmf
    #[arg(short, long)]
    pub rank: Option<usize>,

    /// Include result statistics
    #[arg(long)]
    pub stats: bool,
}

/// Arguments for listing strategies
#[derive(Parser, Debug, Clone)]
pub struct MethodsArgs {
    /// Corpus file (JSON)
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Initialize embeddings so the embedding strategy can be reported
    #[arg(long)]
    pub embeddings: bool,
}

/// Arguments for building the embedding cache
#[derive(Parser, Debug, Clone)]
pub struct EmbedArgs {
    /// Corpus file (JSON)
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Cache artifact path (defaults to the configured path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Re-encode even when a valid cache exists
    #[arg(long)]
    pub force: bool,
}

fn parse_strategy(s: &str) -> Result<Strategy, String> {
    s.parse().map_err(|e: crate::error::StrataError| e.to_string())
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected FIELD=VALUE, got '{s}'")),
    }
}

fn parse_boost(s: &str) -> Result<(String, f64), String> {
    let (field, weight) = parse_key_value(s)?;
    let weight = weight
        .parse::<f64>()
        .map_err(|e| format!("invalid weight for '{field}': {e}"))?;
    Ok((field, weight))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let args = StrataArgs::try_parse_from(["strata", "methods", "docs.json"]).unwrap();
        assert_eq!(args.verbosity(), 1);
        assert_eq!(args.log_filter(), "warn");

        let args = StrataArgs::try_parse_from(["strata", "-vvv", "methods", "docs.json"]).unwrap();
        assert_eq!(args.log_filter(), "debug");

        let args =
            StrataArgs::try_parse_from(["strata", "--quiet", "methods", "docs.json"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_search_args() {
        let args = StrataArgs::try_parse_from([
            "strata",
            "search",
            "docs.json",
            "how do I join",
            "--strategy",
            "lsa",
            "-k",
            "5",
            "--boost",
            "question=3",
            "--filter",
            "course=data-engineering-zoomcamp",
            "--rank",
            "8",
        ])
        .unwrap();

        let Command::Search(search) = args.command else {
            panic!("expected search command");
        };
        assert_eq!(search.strategy, Strategy::LinearFactorization);
        assert_eq!(search.limit, Some(5));
        assert_eq!(search.boosts, vec![("question".to_string(), 3.0)]);
        assert_eq!(
            search.filters,
            vec![("course".to_string(), "data-engineering-zoomcamp".to_string())]
        );
        assert_eq!(search.rank, Some(8));
    }

    #[test]
    fn test_rejects_bad_values() {
        let parse = |extra: [&str; 2]| {
            StrataArgs::try_parse_from(["strata", "search", "d.json", "q", extra[0], extra[1]])
        };
        assert!(parse(["-s", "bm25"]).is_err());
        assert!(parse(["-b", "question"]).is_err());
        assert!(parse(["-b", "text=high"]).is_err());
    }

    #[test]
    fn test_output_format() {
        let argv = ["strata", "--format", "json", "methods", "d.json"];
        let args = StrataArgs::try_parse_from(argv).unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
