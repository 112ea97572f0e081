//! Small dense linear algebra kernels for the factorizations.
//!
//! Matrices here are at most `(rank + oversamples)` wide, so plain loops over
//! `ndarray` views are fast enough and keep the crate free of a LAPACK
//! dependency.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::StandardNormal;

/// Columns whose residual norm falls below this are treated as dependent.
const DEPENDENCE_EPS: f64 = 1e-10;

/// Sweep limit for the Jacobi eigen solver.
const MAX_SWEEPS: usize = 64;

/// A `rows × cols` matrix of independent standard normal samples.
pub fn standard_normal_matrix<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_simple_fn((rows, cols), || rng.sample::<f64, _>(StandardNormal))
}

/// Orthonormalize the columns of `a` in place with modified Gram–Schmidt.
///
/// Columns linearly dependent on earlier ones become zero, so the non-zero
/// columns always form an orthonormal set.
pub fn orthonormalize_columns(a: &mut Array2<f64>) {
    let cols = a.ncols();
    for j in 0..cols {
        let scale = a.column(j).iter().fold(0.0f64, |m, v| m.max(v.abs()));
        for i in 0..j {
            let (done, mut rest) = a.view_mut().split_at(Axis(1), j);
            let q = done.column(i);
            let mut v = rest.column_mut(0);
            let r = q.dot(&v);
            v.scaled_add(-r, &q);
        }
        let mut v = a.column_mut(j);
        let norm = v.dot(&v).sqrt();
        if norm <= DEPENDENCE_EPS * scale.max(1.0) {
            v.fill(0.0);
        } else {
            v /= norm;
        }
    }
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues in descending order and the matching unit
/// eigenvectors as columns.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    debug_assert_eq!(n, matrix.ncols());
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    let total: f64 = a.iter().map(|x| x * x).sum();
    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off <= f64::EPSILON * f64::EPSILON * total || off == 0.0 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (akp, akq) = (a[[k, p]], a[[k, q]]);
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[[p, k]], a[[q, k]]);
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

    let values = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
    let mut vectors = Array2::zeros((n, n));
    for (target, &source) in order.iter().enumerate() {
        vectors.column_mut(target).assign(&v.column(source));
    }
    (values, vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_standard_normal_matrix_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let matrix = standard_normal_matrix(&mut rng, 200, 100);
        assert_eq!(matrix.dim(), (200, 100));
        let samples: Vec<f64> = matrix.iter().copied().collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05, "mean = {mean}");
        assert!((var - 1.0).abs() < 0.05, "var = {var}");
    }

    #[test]
    fn test_orthonormalize() {
        let mut a = array![[1.0, 1.0, 2.0], [0.0, 1.0, 0.0], [1.0, 0.0, 2.0]];
        orthonormalize_columns(&mut a);

        let q0 = a.column(0);
        let q1 = a.column(1);
        assert!((q0.dot(&q0) - 1.0).abs() < 1e-12);
        assert!((q1.dot(&q1) - 1.0).abs() < 1e-12);
        assert!(q0.dot(&q1).abs() < 1e-12);
        // third column is twice the first
        assert!(a.column(2).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_symmetric_eigen() {
        let m = array![[2.0, 1.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.0, 5.0]];
        let (values, vectors) = symmetric_eigen(&m);
        assert!((values[0] - 5.0).abs() < 1e-10);
        assert!((values[1] - 3.0).abs() < 1e-10);
        assert!((values[2] - 1.0).abs() < 1e-10);

        for k in 0..3 {
            let v = vectors.column(k);
            let mv = m.dot(&v);
            for i in 0..3 {
                assert!((mv[i] - values[k] * v[i]).abs() < 1e-9);
            }
        }
    }
}
