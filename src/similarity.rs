//! Cosine similarity with an explicit zero-vector guard.
//!
//! A zero vector on either side scores `0.0`, never NaN.

use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::index::sparse::SparseRow;

/// Rows above which scoring runs on the rayon pool.
const PARALLEL_THRESHOLD: usize = 2048;

/// Cosine of two dense vectors of equal length.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    guarded(dot, norm_a.sqrt() * norm_b.sqrt())
}

/// Cosine of two sparse rows given their precomputed norms.
pub fn cosine_sparse(a: &SparseRow<'_>, a_norm: f64, b: &SparseRow<'_>, b_norm: f64) -> f64 {
    guarded(a.dot(b), a_norm * b_norm)
}

/// Cosine of every row of `matrix` against `query`.
pub fn cosine_rows(
    matrix: ArrayView2<'_, f64>,
    row_norms: &[f64],
    query: ArrayView1<'_, f64>,
) -> Vec<f64> {
    let query_norm = query.dot(&query).sqrt();
    if query_norm == 0.0 {
        return vec![0.0; matrix.nrows()];
    }
    let score = |i: usize| guarded(matrix.row(i).dot(&query), row_norms[i] * query_norm);
    if matrix.nrows() >= PARALLEL_THRESHOLD {
        (0..matrix.nrows()).into_par_iter().map(score).collect()
    } else {
        (0..matrix.nrows()).map(score).collect()
    }
}

/// Euclidean norm of every row.
pub fn row_norms(matrix: ArrayView2<'_, f64>) -> Vec<f64> {
    matrix.rows().into_iter().map(|r| r.dot(&r).sqrt()).collect()
}

fn guarded(dot: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        dot / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sparse::SparseVector;
    use ndarray::array;

    #[test]
    fn test_dense_cosine() {
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert!((cosine(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_vectors_score_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine(&[0.0, 0.0], &[0.0, 0.0]), 0.0);

        let z = SparseVector::zeros(3);
        let v = SparseVector::from_entries(3, vec![(1, 2.0)]);
        assert_eq!(cosine_sparse(&z.as_row(), 0.0, &v.as_row(), 2.0), 0.0);
    }

    #[test]
    fn test_cosine_rows() {
        let m = array![[1.0, 0.0], [0.0, 0.0], [1.0, 1.0]];
        let norms = row_norms(m.view());
        let scores = cosine_rows(m.view(), &norms, array![2.0, 0.0].view());
        assert!((scores[0] - 1.0).abs() < 1e-12);
        assert_eq!(scores[1], 0.0);
        assert!((scores[2] - 1.0 / 2f64.sqrt()).abs() < 1e-12);

        let zero_query = cosine_rows(m.view(), &norms, array![0.0, 0.0].view());
        assert_eq!(zero_query, vec![0.0, 0.0, 0.0]);
    }
}
