//! TF-IDF vectorizer for one text field.

use std::collections::HashSet;
use std::sync::Arc;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::analysis::analyzer::Analyzer;
use crate::error::{Result, StrataError};
use crate::index::sparse::{SparseMatrix, SparseVector};

/// Fitted TF-IDF model.
///
/// Weights are raw term counts times a smoothed inverse document frequency
/// `ln((1 + n) / (1 + df)) + 1`, and every vector is scaled to unit length.
/// Vocabulary columns follow lexicographic term order.
pub struct TfIdfVectorizer {
    /// Vocabulary: term -> column mapping.
    vocabulary: AHashMap<String, usize>,
    /// Column -> term.
    terms: Vec<String>,
    /// Document frequency per column.
    document_frequency: Vec<usize>,
    /// Inverse document frequency per column.
    idf: Vec<f64>,
    /// Number of documents seen during fitting.
    n_documents: usize,
    /// Analyzer for tokenization.
    analyzer: Arc<dyn Analyzer>,
}

impl std::fmt::Debug for TfIdfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfVectorizer")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("n_documents", &self.n_documents)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl TfIdfVectorizer {
    /// Fit on `documents` and return the model with the weighted matrix of
    /// the same documents, one row per document in input order.
    ///
    /// Terms found in fewer than `min_df` documents are dropped. Fails if no
    /// term survives.
    pub fn fit_transform(
        analyzer: Arc<dyn Analyzer>,
        documents: &[&str],
        min_df: usize,
    ) -> Result<(Self, SparseMatrix)> {
        let tokenized: Vec<Vec<String>> = documents
            .par_iter()
            .map(|doc| analyzer.terms(doc))
            .collect::<Result<_>>()?;

        let mut counts: AHashMap<&str, usize> = AHashMap::new();
        for tokens in &tokenized {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for token in unique {
                *counts.entry(token).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|&(_, df)| df >= min_df)
            .collect();
        if kept.is_empty() {
            return Err(StrataError::configuration(format!(
                "no terms remain after applying min_df = {min_df}"
            )));
        }
        kept.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let n = documents.len();
        let mut vocabulary = AHashMap::with_capacity(kept.len());
        let mut terms = Vec::with_capacity(kept.len());
        let mut document_frequency = Vec::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (column, (term, df)) in kept.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), column);
            terms.push(term.to_string());
            document_frequency.push(df);
            idf.push(((n as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0);
        }

        let vectorizer = TfIdfVectorizer {
            vocabulary,
            terms,
            document_frequency,
            idf,
            n_documents: n,
            analyzer,
        };

        let rows: Vec<SparseVector> = tokenized
            .par_iter()
            .map(|tokens| vectorizer.weigh(tokens))
            .collect();
        let matrix = SparseMatrix::from_rows(vectorizer.vocabulary_size(), &rows);

        Ok((vectorizer, matrix))
    }

    /// Transform arbitrary text into this model's weighted space. Unknown
    /// terms are ignored; the fitted statistics never change.
    pub fn transform(&self, text: &str) -> Result<SparseVector> {
        let tokens = self.analyzer.terms(text)?;
        Ok(self.weigh(&tokens))
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut tf: AHashMap<usize, f64> = AHashMap::new();
        for token in tokens {
            if let Some(&column) = self.vocabulary.get(token) {
                *tf.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let entries = tf
            .into_iter()
            .map(|(column, count)| (column, count * self.idf[column]))
            .collect();
        let mut vector = SparseVector::from_entries(self.vocabulary_size(), entries);
        vector.normalize();
        vector
    }

    /// Get the size of the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    /// Column of a term, if it is in the vocabulary.
    pub fn column(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Vocabulary terms in column order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Inverse document frequency per column.
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// Document frequency per column.
    pub fn document_frequency(&self) -> &[usize] {
        &self.document_frequency
    }

    /// Number of documents the model was fitted on.
    pub fn n_documents(&self) -> usize {
        self.n_documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;

    fn fit(documents: &[&str], min_df: usize) -> Result<(TfIdfVectorizer, SparseMatrix)> {
        let analyzer = Arc::new(StandardAnalyzer::new().unwrap());
        TfIdfVectorizer::fit_transform(analyzer, documents, min_df)
    }

    #[test]
    fn test_tfidf_vectorizer() {
        let documents = ["python install guide", "java setup tutorial", "python tutorial"];
        let (vectorizer, matrix) = fit(&documents, 1).unwrap();

        assert_eq!(
            vectorizer.terms(),
            &["guide", "install", "java", "python", "setup", "tutorial"]
        );
        assert_eq!(matrix.n_rows(), 3);
        assert_eq!(matrix.n_cols(), 6);
        assert_eq!(vectorizer.document_frequency()[3], 2);

        // smoothed idf
        let expected = (4.0f64 / 3.0).ln() + 1.0;
        assert!((vectorizer.idf()[3] - expected).abs() < 1e-12);

        for norm in matrix.row_norms() {
            assert!((norm - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_transform_ignores_unknown_terms() {
        let (vectorizer, _) = fit(&["python install guide", "java setup"], 1).unwrap();

        let q = vectorizer.transform("How do I install Python").unwrap();
        assert_eq!(q.as_row().nnz(), 2);
        assert!((q.as_row().norm() - 1.0).abs() < 1e-12);

        let empty = vectorizer.transform("rust cargo").unwrap();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_min_df_prunes() {
        let documents = ["python guide", "python setup", "java setup", "python java"];
        let (vectorizer, _) = fit(&documents, 2).unwrap();
        assert_eq!(vectorizer.terms(), &["java", "python", "setup"]);
    }

    #[test]
    fn test_empty_vocabulary_is_error() {
        let err = fit(&["python guide", "java setup"], 3).unwrap_err();
        assert!(err.is_configuration());
    }
}
