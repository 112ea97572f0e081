//! Non-negative matrix factorization by multiplicative updates.
//!
//! Factorizes `X ≈ W·H` with `W` (`n_rows × rank`) and `H`
//! (`rank × n_cols`) both non-negative, minimizing the Frobenius
//! reconstruction error with the Lee–Seung update rules.

use ndarray::{Array1, Array2, Zip};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::{Result, StrataError};
use crate::index::sparse::{SparseMatrix, SparseRow};

/// Added to every update denominator.
const EPS: f64 = 1e-10;

/// Reconstruction error is evaluated every this many iterations.
const CHECK_EVERY: usize = 10;

/// Stopping rules shared by fitting and query transformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NmfParams {
    /// Iteration cap.
    pub max_iter: usize,
    /// Relative improvement below which iteration stops.
    pub tol: f64,
}

/// A fitted NMF model.
#[derive(Debug, Clone)]
pub struct Nmf {
    /// `H`, `rank × n_cols`.
    components: Array2<f64>,
    /// `H·Hᵀ`, cached for query transformation.
    components_gram: Array2<f64>,
    /// Initial magnitude used for fresh coefficient vectors.
    init_scale: f64,
    params: NmfParams,
    n_iter: usize,
    reconstruction_err: f64,
}

impl Nmf {
    /// Fit `rank` components and return the model with `W`, the
    /// `n_rows × rank` coefficient matrix of the training rows.
    ///
    /// `seed` of `None` draws the initialization from OS entropy.
    pub fn fit(
        matrix: &SparseMatrix,
        rank: usize,
        params: NmfParams,
        seed: Option<u64>,
    ) -> Result<(Self, Array2<f64>)> {
        if !matrix.is_non_negative() {
            return Err(StrataError::invalid_parameter(
                "non-negative factorization requires a non-negative matrix",
            ));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let init_scale = (matrix.mean() / rank as f64).sqrt();
        let mut w = Array2::from_shape_simple_fn((matrix.n_rows(), rank), || {
            init_scale * rng.sample::<f64, _>(StandardNormal).abs()
        });
        let mut h = Array2::from_shape_simple_fn((rank, matrix.n_cols()), || {
            init_scale * rng.sample::<f64, _>(StandardNormal).abs()
        });

        let x_sq = matrix.frobenius_sq();
        let initial_err = {
            let xht = matrix.dot_dense(&h.t().to_owned());
            reconstruction_error(x_sq, &w, &h, &xht)
        };
        let mut previous_err = initial_err;
        let mut n_iter = 0;

        for iteration in 1..=params.max_iter {
            n_iter = iteration;

            // H ← H ∘ (WᵀX) / (WᵀW·H)
            let wtx = matrix.transpose_dot_dense(&w).reversed_axes();
            let wtw = w.t().dot(&w);
            let denominator = wtw.dot(&h);
            Zip::from(&mut h)
                .and(&wtx)
                .and(&denominator)
                .for_each(|h, &num, &den| *h *= num / (den + EPS));

            // W ← W ∘ (XHᵀ) / (W·HHᵀ)
            let xht = matrix.dot_dense(&h.t().to_owned());
            let hht = h.dot(&h.t());
            let denominator = w.dot(&hht);
            Zip::from(&mut w)
                .and(&xht)
                .and(&denominator)
                .for_each(|w, &num, &den| *w *= num / (den + EPS));

            if params.tol > 0.0 && iteration % CHECK_EVERY == 0 {
                let err = reconstruction_error(x_sq, &w, &h, &xht);
                if initial_err > 0.0 && (previous_err - err) / initial_err < params.tol {
                    break;
                }
                previous_err = err;
            }
        }

        let err = reconstruction_error(x_sq, &w, &h, &matrix.dot_dense(&h.t().to_owned()));

        debug!(
            rank,
            iterations = n_iter,
            error = err,
            "Fitted non-negative factorization"
        );

        let components_gram = h.dot(&h.t());
        let model = Nmf {
            components: h,
            components_gram,
            init_scale,
            params,
            n_iter,
            reconstruction_err: err,
        };
        Ok((model, w))
    }

    /// Number of components.
    pub fn rank(&self) -> usize {
        self.components.nrows()
    }

    /// The component matrix `H`.
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    /// Iterations run during fitting.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Frobenius reconstruction error at the last check.
    pub fn reconstruction_err(&self) -> f64 {
        self.reconstruction_err
    }

    /// Solve for the non-negative coefficients of one row with `H` fixed.
    ///
    /// A row with no overlap with the components maps to the zero vector.
    pub fn transform(&self, row: &SparseRow<'_>) -> Array1<f64> {
        let rank = self.rank();
        let numerator: Array1<f64> = self
            .components
            .rows()
            .into_iter()
            .map(|c| row.dot_dense(c))
            .collect();
        if numerator.iter().all(|&v| v <= 0.0) {
            return Array1::zeros(rank);
        }

        let start = if self.init_scale > 0.0 {
            self.init_scale
        } else {
            1.0
        };
        let mut w = Array1::from_elem(rank, start);
        for _ in 0..self.params.max_iter {
            let denominator = w.dot(&self.components_gram);
            let next = Zip::from(&w)
                .and(&numerator)
                .and(&denominator)
                .map_collect(|&w, &num, &den| w * num / (den + EPS));

            let norm = w.dot(&w).sqrt();
            let delta = (&next - &w).mapv(|d| d * d).sum().sqrt();
            w = next;
            if norm == 0.0 || delta / norm < self.params.tol {
                break;
            }
        }
        w
    }
}

/// `‖X − WH‖_F` from the expansion
/// `‖X‖² − 2·tr(Wᵀ·XHᵀ) + tr(WᵀW·HHᵀ)`, which never forms `WH`.
fn reconstruction_error(x_sq: f64, w: &Array2<f64>, h: &Array2<f64>, xht: &Array2<f64>) -> f64 {
    let cross: f64 = Zip::from(w).and(xht).fold(0.0, |acc, &a, &b| acc + a * b);
    let wtw = w.t().dot(w);
    let hht = h.dot(&h.t());
    let quadratic: f64 = Zip::from(&wtw).and(&hht).fold(0.0, |acc, &a, &b| acc + a * b);
    (x_sq - 2.0 * cross + quadratic).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sparse::SparseVector;

    fn params() -> NmfParams {
        NmfParams {
            max_iter: 1000,
            tol: 1e-8,
        }
    }

    fn matrix(rows: &[&[f64]]) -> SparseMatrix {
        let n_cols = rows[0].len();
        let rows: Vec<SparseVector> = rows
            .iter()
            .map(|r| SparseVector::from_entries(n_cols, r.iter().copied().enumerate().collect()))
            .collect();
        SparseMatrix::from_rows(n_cols, &rows)
    }

    fn topics() -> SparseMatrix {
        // two disjoint topics
        matrix(&[
            &[1.0, 1.0, 0.0, 0.0],
            &[2.0, 2.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0, 1.0],
            &[0.0, 0.0, 3.0, 3.0],
        ])
    }

    #[test]
    fn test_factors_are_non_negative() {
        let (model, w) = Nmf::fit(&topics(), 2, params(), Some(42)).unwrap();
        assert!(w.iter().all(|&v| v >= 0.0));
        assert!(model.components().iter().all(|&v| v >= 0.0));
        assert_eq!(w.dim(), (4, 2));
        assert_eq!(model.components().dim(), (2, 4));
    }

    #[test]
    fn test_separates_disjoint_topics() {
        let (model, w) = Nmf::fit(&topics(), 2, params(), Some(42)).unwrap();
        assert!(model.reconstruction_err() < 0.5, "err = {}", model.reconstruction_err());

        // rows of the same topic load on the same component
        let dominant = |i: usize| if w[[i, 0]] >= w[[i, 1]] { 0 } else { 1 };
        assert_eq!(dominant(0), dominant(1));
        assert_eq!(dominant(2), dominant(3));
        assert_ne!(dominant(0), dominant(2));
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let (a, wa) = Nmf::fit(&topics(), 2, params(), Some(7)).unwrap();
        let (b, wb) = Nmf::fit(&topics(), 2, params(), Some(7)).unwrap();
        assert_eq!(wa, wb);
        assert_eq!(a.components(), b.components());
    }

    #[test]
    fn test_transform() {
        let m = topics();
        let (model, w) = Nmf::fit(&m, 2, params(), Some(42)).unwrap();
        let dominant_row = if w[[0, 0]] >= w[[0, 1]] { 0 } else { 1 };

        let query = SparseVector::from_entries(4, vec![(0, 1.0)]);
        let coefficients = model.transform(&query.as_row());
        assert!(coefficients.iter().all(|&v| v >= 0.0));
        assert!(coefficients[dominant_row] > coefficients[1 - dominant_row]);

        let zero = model.transform(&SparseVector::zeros(4).as_row());
        assert!(zero.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rejects_negative_input() {
        let m = matrix(&[&[1.0, -1.0]]);
        let err = Nmf::fit(&m, 1, params(), Some(1)).unwrap_err();
        assert!(err.is_invalid_parameter());
    }
}
