//! The immutable corpus index.
//!
//! Built once from an ordered corpus. For every configured text field it
//! holds a fitted [`TfIdfVectorizer`] and the `|corpus| × |vocabulary|`
//! term-weight matrix, row-aligned with the corpus.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use rayon::prelude::*;
use tracing::info;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::config::{WeightingConfig, validate_fields};
use crate::corpus::Record;
use crate::error::{Result, StrataError};
use crate::index::sparse::{SparseMatrix, SparseVector};
use crate::index::vectorizer::TfIdfVectorizer;

/// Term-weighted representation of one text field.
#[derive(Debug)]
pub struct FieldRepresentation {
    name: String,
    vectorizer: TfIdfVectorizer,
    matrix: SparseMatrix,
    row_norms: Vec<f64>,
}

impl FieldRepresentation {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fitted weighting model.
    pub fn vectorizer(&self) -> &TfIdfVectorizer {
        &self.vectorizer
    }

    /// The term-weight matrix.
    pub fn matrix(&self) -> &SparseMatrix {
        &self.matrix
    }

    /// Euclidean norm of every matrix row.
    pub fn row_norms(&self) -> &[f64] {
        &self.row_norms
    }

    /// Number of vocabulary terms.
    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    /// Transform query text into this field's term-weight space.
    pub fn transform(&self, text: &str) -> Result<SparseVector> {
        self.vectorizer.transform(text)
    }
}

/// Ordered records plus one [`FieldRepresentation`] per text field.
#[derive(Debug)]
pub struct CorpusIndex {
    records: Vec<Record>,
    fields: Vec<String>,
    representations: Vec<FieldRepresentation>,
    positions: AHashMap<String, usize>,
    weighting: WeightingConfig,
}

impl CorpusIndex {
    /// Build the index.
    ///
    /// # Errors
    ///
    /// - [`StrataError::EmptyCorpus`] if `corpus` has no records
    /// - [`StrataError::MissingField`] if a record lacks a configured field
    /// - [`StrataError::Configuration`] for empty or duplicated `fields`, an
    ///   invalid token pattern, or a field whose vocabulary is empty after
    ///   `min_df` pruning
    pub fn build(
        corpus: Vec<Record>,
        fields: &[String],
        weighting: &WeightingConfig,
    ) -> Result<Self> {
        validate_fields(fields)?;
        if corpus.is_empty() {
            return Err(StrataError::EmptyCorpus);
        }
        for (i, record) in corpus.iter().enumerate() {
            if let Some(missing) = fields.iter().find(|f| !record.contains(f)) {
                return Err(StrataError::MissingField {
                    field: missing.clone(),
                    record: i,
                });
            }
        }

        let start = Instant::now();
        let analyzer: Arc<dyn Analyzer> = Arc::new(StandardAnalyzer::from_config(weighting)?);
        let min_df = weighting.effective_min_df();

        let representations = fields
            .par_iter()
            .map(|field| {
                let documents: Vec<&str> = corpus
                    .iter()
                    .map(|r| r.get(field).unwrap_or_default())
                    .collect();
                let (vectorizer, matrix) =
                    TfIdfVectorizer::fit_transform(Arc::clone(&analyzer), &documents, min_df)
                        .map_err(|e| match e {
                            StrataError::Configuration(msg) => StrataError::configuration(
                                format!("field '{field}': {msg}"),
                            ),
                            other => other,
                        })?;
                let row_norms = matrix.row_norms();
                Ok(FieldRepresentation {
                    name: field.clone(),
                    vectorizer,
                    matrix,
                    row_norms,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let positions = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.clone(), i))
            .collect();

        info!(
            records = corpus.len(),
            fields = fields.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built corpus index"
        );

        Ok(CorpusIndex {
            records: corpus,
            fields: fields.to_vec(),
            representations,
            positions,
            weighting: weighting.clone(),
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a built index; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in corpus order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record at a corpus position.
    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Configured text fields in configuration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Representations in field order.
    pub fn representations(&self) -> &[FieldRepresentation] {
        &self.representations
    }

    /// Representation of one text field.
    pub fn field(&self, name: &str) -> Result<&FieldRepresentation> {
        self.positions
            .get(name)
            .map(|&i| &self.representations[i])
            .ok_or_else(|| StrataError::UnknownField(name.to_string()))
    }

    /// The weighting configuration the index was built with.
    pub fn weighting(&self) -> &WeightingConfig {
        &self.weighting
    }

    /// Whether any record carries `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.records.iter().any(|r| r.contains(field))
    }

    /// Distinct values of a field in order of first appearance. Records
    /// without the field are skipped.
    pub fn distinct_values(&self, field: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter_map(|r| r.get(field))
            .filter(|v| seen.insert(*v))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Record> {
        vec![
            Record::from_pairs([("text", "python install guide"), ("course", "A")]),
            Record::from_pairs([("text", "java setup tutorial"), ("course", "B")]),
            Record::from_pairs([("text", "python tutorial"), ("course", "A")]),
        ]
    }

    fn fields() -> Vec<String> {
        vec!["text".to_string()]
    }

    #[test]
    fn test_build() {
        let index = CorpusIndex::build(corpus(), &fields(), &WeightingConfig::default()).unwrap();
        assert_eq!(index.len(), 3);
        let text = index.field("text").unwrap();
        assert_eq!(text.matrix().n_rows(), 3);
        assert_eq!(text.row_norms().len(), 3);
        assert_eq!(text.vocabulary_size(), 6);
        assert_eq!(index.distinct_values("course"), vec!["A", "B"]);
        assert!(index.has_field("course"));
        assert!(!index.has_field("year"));
    }

    #[test]
    fn test_empty_corpus() {
        let err = CorpusIndex::build(vec![], &fields(), &WeightingConfig::default()).unwrap_err();
        assert!(matches!(err, StrataError::EmptyCorpus));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_field() {
        let mut records = corpus();
        records.push(Record::from_pairs([("course", "C")]));
        let err = CorpusIndex::build(records, &fields(), &WeightingConfig::default()).unwrap_err();
        match err {
            StrataError::MissingField { field, record } => {
                assert_eq!(field, "text");
                assert_eq!(record, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_string_is_valid_text() {
        let mut records = corpus();
        records.push(Record::from_pairs([("text", ""), ("course", "C")]));
        let index = CorpusIndex::build(records, &fields(), &WeightingConfig::default()).unwrap();
        assert_eq!(index.field("text").unwrap().row_norms()[3], 0.0);
    }

    #[test]
    fn test_unknown_field() {
        let index = CorpusIndex::build(corpus(), &fields(), &WeightingConfig::default()).unwrap();
        let err = index.field("question").unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_pruned_vocabulary_names_field() {
        let weighting = WeightingConfig {
            min_df: 5,
            ..Default::default()
        };
        let err = CorpusIndex::build(corpus(), &fields(), &weighting).unwrap_err();
        assert!(err.to_string().contains("field 'text'"));
    }
}
