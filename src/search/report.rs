//! Presentation helpers: per-hit summaries and result statistics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::search::results::{SearchHit, SearchResults};

/// Characters of text kept in a preview.
pub const PREVIEW_CHARS: usize = 200;

/// Display-ready view of a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitSummary {
    /// 1-based position in the result list.
    pub rank: usize,
    /// Corpus position.
    pub doc_index: usize,
    /// Score rounded to four decimals.
    pub score: f64,
    pub course: String,
    pub section: String,
    pub question: String,
    /// Text truncated to [`PREVIEW_CHARS`] characters, with `...` appended
    /// when anything was cut.
    pub preview: String,
    /// The untruncated text.
    pub full_text: String,
}

/// Summarize every hit of a result set.
pub fn summarize(results: &SearchResults) -> Vec<HitSummary> {
    results
        .hits
        .iter()
        .enumerate()
        .map(|(i, hit)| summarize_hit(i + 1, hit))
        .collect()
}

/// Summarize one hit.
pub fn summarize_hit(rank: usize, hit: &SearchHit) -> HitSummary {
    let field = |name: &str| hit.record.get(name).unwrap_or_default().to_string();
    let full_text = field("text");
    HitSummary {
        rank,
        doc_index: hit.doc_index,
        score: round4(hit.score),
        course: field("course"),
        section: field("section"),
        question: field("question"),
        preview: preview(&full_text, PREVIEW_CHARS),
        full_text,
    }
}

/// Cut `text` to `max_chars` characters and mark the cut with `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn round4(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

/// Minimum, maximum and mean of the returned scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Aggregate view of a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultStatistics {
    pub total_results: usize,
    pub score_range: ScoreRange,
    /// `(value, count)` of the category field, most frequent first.
    pub category_distribution: Vec<(String, usize)>,
    /// `(value, count)` of the `section` field, most frequent first.
    pub section_distribution: Vec<(String, usize)>,
}

/// Compute statistics over the hits, or `None` when there are none.
///
/// Records without the category or section field are counted under the
/// empty string.
pub fn statistics(results: &SearchResults, category_field: &str) -> Option<ResultStatistics> {
    let hits = &results.hits;
    if hits.is_empty() {
        return None;
    }

    let (min, max, sum) = hits.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), h| (min.min(h.score), max.max(h.score), sum + h.score),
    );

    Some(ResultStatistics {
        total_results: hits.len(),
        score_range: ScoreRange {
            min,
            max,
            avg: sum / hits.len() as f64,
        },
        category_distribution: distribution(hits, category_field),
        section_distribution: distribution(hits, "section"),
    })
}

fn distribution(hits: &[SearchHit], field: &str) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for hit in hits {
        *counts.entry(hit.record.get(field).unwrap_or_default()).or_default() += 1;
    }
    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::corpus::Record;
    use crate::search::strategy::Strategy;

    fn results() -> SearchResults {
        let hit = |doc_index, score, course: &str, section: &str| SearchHit {
            doc_index,
            score,
            record: Record::from_pairs([
                ("course", course),
                ("section", section),
                ("text", "short"),
            ]),
        };
        let hits = vec![
            hit(4, 0.912_345_6, "B", "setup"),
            hit(1, 0.5, "A", "setup"),
            hit(0, 0.1, "B", "intro"),
        ];
        SearchResults {
            total_results: hits.len(),
            hits,
            strategy: Strategy::Lexical,
            query: "q".to_string(),
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("abc", 5), "abc");
        assert_eq!(preview("abcde", 5), "abcde");
        assert_eq!(preview("abcdef", 5), "abcde...");
        // multi-byte characters are never split
        assert_eq!(preview("ééééé", 2), "éé...");

        let long = "x".repeat(250);
        let cut = preview(&long, PREVIEW_CHARS);
        assert_eq!(cut.len(), PREVIEW_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_summarize() {
        let summaries = summarize(&results());
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].rank, 1);
        assert_eq!(summaries[0].doc_index, 4);
        assert_eq!(summaries[0].score, 0.9123);
        assert_eq!(summaries[0].course, "B");
        assert_eq!(summaries[0].question, "");
        assert_eq!(summaries[0].preview, "short");
    }

    #[test]
    fn test_statistics() {
        let stats = statistics(&results(), "course").unwrap();
        assert_eq!(stats.total_results, 3);
        assert_eq!(stats.score_range.min, 0.1);
        assert_eq!(stats.score_range.max, 0.912_345_6);
        assert!((stats.score_range.avg - (0.912_345_6 + 0.5 + 0.1) / 3.0).abs() < 1e-12);
        assert_eq!(
            stats.category_distribution,
            vec![("B".to_string(), 2), ("A".to_string(), 1)]
        );
        assert_eq!(
            stats.section_distribution,
            vec![("setup".to_string(), 2), ("intro".to_string(), 1)]
        );
    }

    #[test]
    fn test_statistics_empty() {
        let mut empty = results();
        empty.hits.clear();
        assert!(statistics(&empty, "course").is_none());
    }
}
