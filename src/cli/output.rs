//! Output formatting for CLI commands.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, StrataArgs};
use crate::search::StrategyInfo;
use crate::search::report::{HitSummary, ResultStatistics};

/// Output of the `search` command.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchOutput {
    pub strategy: String,
    pub query: String,
    pub total_results: usize,
    pub elapsed_ms: f64,
    pub hits: Vec<HitSummary>,
    pub statistics: Option<ResultStatistics>,
}

/// Output of the `methods` command.
#[derive(Debug, Serialize, Deserialize)]
pub struct MethodsOutput {
    pub methods: Vec<StrategyInfo>,
    pub categories: Vec<String>,
}

/// Output of the `embed` command.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedOutput {
    pub path: PathBuf,
    pub records: usize,
    pub dimension: Option<usize>,
    pub duration_ms: u64,
}

/// Plain-text rendering for the human output format.
pub trait HumanReadable {
    fn render(&self) -> String;
}

impl HumanReadable for SearchOutput {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} result(s) for \"{}\" using {} ({:.1} ms)",
            self.total_results, self.query, self.strategy, self.elapsed_ms
        );
        for hit in &self.hits {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{:>3}. [{:.4}] #{} {} / {}",
                hit.rank, hit.score, hit.doc_index, hit.course, hit.section
            );
            if !hit.question.is_empty() {
                let _ = writeln!(out, "     Q: {}", hit.question);
            }
            if !hit.preview.is_empty() {
                let _ = writeln!(out, "     {}", hit.preview.replace('\n', " "));
            }
        }
        if let Some(stats) = &self.statistics {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "score min {:.4}, max {:.4}, avg {:.4}",
                stats.score_range.min, stats.score_range.max, stats.score_range.avg
            );
            let _ = writeln!(
                out,
                "categories: {}",
                format_distribution(&stats.category_distribution)
            );
            let _ = writeln!(
                out,
                "sections:   {}",
                format_distribution(&stats.section_distribution)
            );
        }
        out
    }
}

impl HumanReadable for MethodsOutput {
    fn render(&self) -> String {
        let mut out = String::from("Available methods:\n");
        for info in &self.methods {
            let boost = if info.supports_boost { " [boost]" } else { "" };
            let _ = writeln!(out, "  {:<10} {}{}", info.name, info.description, boost);
        }
        if !self.categories.is_empty() {
            let _ = writeln!(out, "Categories:");
            for category in &self.categories {
                let _ = writeln!(out, "  {category}");
            }
        }
        out
    }
}

impl HumanReadable for EmbedOutput {
    fn render(&self) -> String {
        format!(
            "Embeddings for {} record(s), dimension {}, at {} ({} ms)\n",
            self.records,
            self.dimension.map_or_else(|| "?".to_string(), |d| d.to_string()),
            self.path.display(),
            self.duration_ms
        )
    }
}

fn format_distribution(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .map(|(value, count)| {
            let value = if value.is_empty() { "(none)" } else { value.as_str() };
            format!("{value} ({count})")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a result in the selected format.
pub fn render_output<T: Serialize + HumanReadable>(
    result: &T,
    args: &StrataArgs,
) -> anyhow::Result<String> {
    Ok(match args.output_format {
        OutputFormat::Human => result.render(),
        OutputFormat::Json if args.pretty => serde_json::to_string_pretty(result)? + "\n",
        OutputFormat::Json => serde_json::to_string(result)? + "\n",
    })
}

/// Print a result in the selected format.
pub fn output_result<T: Serialize + HumanReadable>(
    result: &T,
    args: &StrataArgs,
) -> anyhow::Result<()> {
    let rendered = render_output(result, args)?;
    if args.verbosity() > 0 || args.output_format == OutputFormat::Json {
        print!("{rendered}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::search::Strategy;

    fn methods() -> MethodsOutput {
        MethodsOutput {
            methods: vec![Strategy::Lexical.info(), Strategy::LinearFactorization.info()],
            categories: vec!["A".to_string()],
        }
    }

    #[test]
    fn test_render_human() {
        let args = StrataArgs::try_parse_from(["strata", "methods", "d.json"]).unwrap();
        let text = render_output(&methods(), &args).unwrap();
        assert!(text.contains("tfidf"));
        assert!(text.contains("[boost]"));
        assert!(text.contains("Categories:"));
    }

    #[test]
    fn test_render_json() {
        let args =
            StrataArgs::try_parse_from(["strata", "-f", "json", "methods", "d.json"]).unwrap();
        let text = render_output(&methods(), &args).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["methods"][1]["name"], "svd");
        assert_eq!(value["categories"][0], "A");
    }

    #[test]
    fn test_format_distribution() {
        let counts = vec![("A".to_string(), 2), (String::new(), 1)];
        assert_eq!(format_distribution(&counts), "A (2), (none) (1)");
    }
}
