//! Randomized truncated SVD.
//!
//! Range finding follows Halko, Martinsson and Tropp: project onto random
//! Gaussian directions, sharpen with power iterations, then solve the small
//! problem `B = QᵀA` exactly through the eigen-decomposition of `BBᵀ`.

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::index::sparse::{SparseMatrix, SparseRow};
use crate::latent::linalg::{orthonormalize_columns, standard_normal_matrix, symmetric_eigen};

/// Relative singular value below which a component is treated as empty.
const RANK_EPS: f64 = 1e-10;

/// A fitted truncated SVD: the top right singular vectors of a matrix.
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    /// `rank × n_cols`, one right singular vector per row.
    components: Array2<f64>,
    singular_values: Array1<f64>,
}

impl TruncatedSvd {
    /// Fit `rank` components of `matrix`.
    ///
    /// The caller guarantees `1 <= rank <= matrix.n_cols()`. When the matrix
    /// has fewer than `rank` non-trivial singular values the trailing
    /// components are zero vectors.
    pub fn fit(
        matrix: &SparseMatrix,
        rank: usize,
        oversamples: usize,
        power_iterations: usize,
        seed: u64,
    ) -> Self {
        let n_cols = matrix.n_cols();
        let width = (rank + oversamples).min(n_cols).max(rank);
        let mut rng = StdRng::seed_from_u64(seed);

        let omega = standard_normal_matrix(&mut rng, n_cols, width);
        let mut q = matrix.dot_dense(&omega);
        orthonormalize_columns(&mut q);
        for _ in 0..power_iterations {
            let mut z = matrix.transpose_dot_dense(&q);
            orthonormalize_columns(&mut z);
            q = matrix.dot_dense(&z);
            orthonormalize_columns(&mut q);
        }

        // Bᵀ = AᵀQ, n_cols × width
        let b_t = matrix.transpose_dot_dense(&q);
        let gram = b_t.t().dot(&b_t);
        let (eigenvalues, eigenvectors) = symmetric_eigen(&gram);

        let largest = eigenvalues.first().copied().unwrap_or(0.0).max(0.0).sqrt();
        let mut components = Array2::zeros((rank, n_cols));
        let mut singular_values = Array1::zeros(rank);
        for k in 0..rank.min(eigenvalues.len()) {
            let sigma = eigenvalues[k].max(0.0).sqrt();
            if sigma <= RANK_EPS * largest.max(1.0) {
                continue;
            }
            let mut v = b_t.dot(&eigenvectors.column(k));
            v /= sigma;
            flip_sign(&mut v);
            components.row_mut(k).assign(&v);
            singular_values[k] = sigma;
        }

        TruncatedSvd {
            components,
            singular_values,
        }
    }

    /// Number of components.
    pub fn rank(&self) -> usize {
        self.components.nrows()
    }

    /// Right singular vectors as rows.
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    /// Singular values in descending order.
    pub fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    /// Project every row of `matrix`. Returns `n_rows × rank`.
    pub fn transform_matrix(&self, matrix: &SparseMatrix) -> Array2<f64> {
        matrix.dot_dense(&self.components.t().to_owned())
    }

    /// Project one sparse row.
    pub fn transform(&self, row: &SparseRow<'_>) -> Array1<f64> {
        self.components
            .rows()
            .into_iter()
            .map(|c| row.dot_dense(c))
            .collect()
    }
}

/// Make the entry with the largest magnitude positive, so a component's sign
/// does not depend on the rounding of the solver.
fn flip_sign(v: &mut Array1<f64>) {
    let pivot = v
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        v.mapv_inplace(|x| -x);
    }
}
