//! Compressed sparse row storage for term-weight matrices.
//!
//! Rows are records, columns are vocabulary terms. Column indices within a
//! row are strictly increasing, which keeps sparse–sparse dot products a
//! linear merge.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// A borrowed view of one sparse row.
#[derive(Debug, Clone, Copy)]
pub struct SparseRow<'a> {
    /// Column indices, strictly increasing.
    pub indices: &'a [usize],
    /// Values aligned with `indices`.
    pub values: &'a [f64],
}

impl<'a> SparseRow<'a> {
    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Dot product with another sparse row.
    pub fn dot(&self, other: &SparseRow<'_>) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Dot product with a dense vector indexed by column.
    pub fn dot_dense(&self, dense: ArrayView1<'_, f64>) -> f64 {
        self.indices
            .iter()
            .zip(self.values)
            .map(|(&c, &v)| v * dense[c])
            .sum()
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

/// An owned sparse vector, e.g. a transformed query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseVector {
    dim: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    /// Build from `(column, value)` entries. Entries are sorted by column,
    /// duplicate columns are summed and zero values dropped.
    pub fn from_entries(dim: usize, mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|&(c, _)| c);
        let mut indices: Vec<usize> = Vec::with_capacity(entries.len());
        let mut values: Vec<f64> = Vec::with_capacity(entries.len());
        for (c, v) in entries {
            debug_assert!(c < dim, "column {c} out of bounds for dimension {dim}");
            if indices.last() == Some(&c) {
                if let Some(last) = values.last_mut() {
                    *last += v;
                }
            } else {
                indices.push(c);
                values.push(v);
            }
        }
        let (indices, values): (Vec<usize>, Vec<f64>) = indices
            .into_iter()
            .zip(values)
            .filter(|&(_, v)| v != 0.0)
            .unzip();
        SparseVector {
            dim,
            indices,
            values,
        }
    }

    /// An all-zero vector.
    pub fn zeros(dim: usize) -> Self {
        SparseVector {
            dim,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Logical length.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Whether the vector has no non-zero entry.
    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    /// Borrow as a row view.
    pub fn as_row(&self) -> SparseRow<'_> {
        SparseRow {
            indices: &self.indices,
            values: &self.values,
        }
    }

    /// Scale to unit Euclidean norm; zero vectors stay zero.
    pub fn normalize(&mut self) {
        let norm = self.as_row().norm();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }
}

/// A CSR matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl SparseMatrix {
    /// Stack sparse vectors as rows.
    pub fn from_rows(n_cols: usize, rows: &[SparseVector]) -> Self {
        let nnz = rows.iter().map(|r| r.indices.len()).sum();
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut data = Vec::with_capacity(nnz);
        indptr.push(0);
        for row in rows {
            debug_assert_eq!(row.dim, n_cols);
            indices.extend_from_slice(&row.indices);
            data.extend_from_slice(&row.values);
            indptr.push(indices.len());
        }
        SparseMatrix {
            n_rows: rows.len(),
            n_cols,
            indptr,
            indices,
            data,
        }
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// View row `i`.
    pub fn row(&self, i: usize) -> SparseRow<'_> {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        SparseRow {
            indices: &self.indices[start..end],
            values: &self.data[start..end],
        }
    }

    /// Iterate over all rows in order.
    pub fn rows(&self) -> impl Iterator<Item = SparseRow<'_>> {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Euclidean norm of every row.
    pub fn row_norms(&self) -> Vec<f64> {
        self.rows().map(|r| r.norm()).collect()
    }

    /// Mean over all `n_rows × n_cols` cells, zeros included.
    pub fn mean(&self) -> f64 {
        let cells = (self.n_rows * self.n_cols) as f64;
        if cells == 0.0 {
            0.0
        } else {
            self.data.iter().sum::<f64>() / cells
        }
    }

    /// Squared Frobenius norm.
    pub fn frobenius_sq(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }

    /// Whether every stored value is non-negative.
    pub fn is_non_negative(&self) -> bool {
        self.data.iter().all(|&v| v >= 0.0)
    }

    /// `self · dense`, where `dense` is `n_cols × l`. Returns `n_rows × l`.
    pub fn dot_dense(&self, dense: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(dense.nrows(), self.n_cols);
        let mut out = Array2::zeros((self.n_rows, dense.ncols()));
        for (i, row) in self.rows().enumerate() {
            let mut target = out.row_mut(i);
            for (c, v) in row.iter() {
                target.scaled_add(v, &dense.row(c));
            }
        }
        out
    }

    /// `selfᵀ · dense`, where `dense` is `n_rows × l`. Returns `n_cols × l`.
    pub fn transpose_dot_dense(&self, dense: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(dense.nrows(), self.n_rows);
        let mut out = Array2::zeros((self.n_cols, dense.ncols()));
        for (i, row) in self.rows().enumerate() {
            let source = dense.row(i);
            for (c, v) in row.iter() {
                out.row_mut(c).scaled_add(v, &source);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> SparseMatrix {
        // [[1, 0, 2],
        //  [0, 0, 0],
        //  [0, 3, 0]]
        let rows = vec![
            SparseVector::from_entries(3, vec![(2, 2.0), (0, 1.0)]),
            SparseVector::zeros(3),
            SparseVector::from_entries(3, vec![(1, 3.0)]),
        ];
        SparseMatrix::from_rows(3, &rows)
    }

    #[test]
    fn test_from_entries_sorts_and_merges() {
        let v = SparseVector::from_entries(5, vec![(3, 1.0), (1, 2.0), (3, 0.5), (4, 0.0)]);
        let row = v.as_row();
        assert_eq!(row.indices, &[1, 3]);
        assert_eq!(row.values, &[2.0, 1.5]);
    }

    #[test]
    fn test_row_access_and_norms() {
        let m = sample();
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row(0).indices, &[0, 2]);
        assert_eq!(m.row(1).nnz(), 0);
        let norms = m.row_norms();
        assert!((norms[0] - 5f64.sqrt()).abs() < 1e-12);
        assert_eq!(norms[1], 0.0);
        assert!((m.mean() - 6.0 / 9.0).abs() < 1e-12);
        assert!(m.is_non_negative());
    }

    #[test]
    fn test_sparse_dot() {
        let a = SparseVector::from_entries(4, vec![(0, 1.0), (2, 2.0), (3, 1.0)]);
        let b = SparseVector::from_entries(4, vec![(2, 3.0), (3, -1.0)]);
        assert_eq!(a.as_row().dot(&b.as_row()), 5.0);
    }

    #[test]
    fn test_dense_products() {
        let m = sample();
        let dense = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let product = m.dot_dense(&dense);
        assert_eq!(product, array![[3.0, 2.0], [0.0, 0.0], [0.0, 3.0]]);

        let left = array![[1.0], [5.0], [2.0]];
        let t = m.transpose_dot_dense(&left);
        assert_eq!(t, array![[1.0], [6.0], [2.0]]);
    }

    #[test]
    fn test_normalize() {
        let mut v = SparseVector::from_entries(2, vec![(0, 3.0), (1, 4.0)]);
        v.normalize();
        assert!((v.as_row().norm() - 1.0).abs() < 1e-12);

        let mut z = SparseVector::zeros(2);
        z.normalize();
        assert!(z.is_zero());
    }
}
