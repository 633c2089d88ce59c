//! Small dense linear algebra for the likelihood surface fit.
//!
//! The quadratic fit has six unknowns, so a least-squares problem `A x ≈ b`
//! is reduced to its `n × n` normal matrix `AᵀA` and solved in that
//! matrix's eigenbasis. The singular values of `A` are the square roots of
//! the normal-matrix eigenvalues.

use ndarray::{s, Array1, Array2, Axis, Zip};

const MAX_SWEEPS: usize = 64;
/// Squared off-diagonal mass, relative to the squared Frobenius norm, at
/// which a Jacobi sweep counts as converged.
const OFF_DIAGONAL_TOLERANCE: f64 = 1e-30;

/// `M = V · diag(values) · Vᵀ` for a symmetric `M`.
///
/// Eigenvalues are sorted in descending order; column `k` of `vectors`
/// belongs to `values[k]`.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub values: Array1<f64>,
    pub vectors: Array2<f64>,
}

/// `(AᵀA, Aᵀb)` for the least-squares problem `A x ≈ b`.
pub fn normal_equations(a: &Array2<f64>, b: &Array1<f64>) -> (Array2<f64>, Array1<f64>) {
    (a.t().dot(a), a.t().dot(b))
}

fn off_diagonal_sq(m: &Array2<f64>) -> f64 {
    m.indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, v)| v * v)
        .sum()
}

/// `M ← M·J` for the plane rotation `J` acting on columns `p < q`.
fn rotate_columns(m: &mut Array2<f64>, p: usize, q: usize, cos: f64, sin: f64) {
    let (mut col_p, mut col_q) = m.multi_slice_mut((s![.., p], s![.., q]));
    Zip::from(&mut col_p).and(&mut col_q).for_each(|xp, xq| {
        let (a, b) = (*xp, *xq);
        *xp = cos * a - sin * b;
        *xq = sin * a + cos * b;
    });
}

/// `M ← Jᵀ·M` for the plane rotation `J` acting on rows `p < q`.
fn rotate_rows(m: &mut Array2<f64>, p: usize, q: usize, cos: f64, sin: f64) {
    let (mut row_p, mut row_q) = m.multi_slice_mut((s![p, ..], s![q, ..]));
    Zip::from(&mut row_p).and(&mut row_q).for_each(|xp, xq| {
        let (a, b) = (*xp, *xq);
        *xp = cos * a - sin * b;
        *xq = sin * a + cos * b;
    });
}

/// Cyclic Jacobi eigen decomposition. Only symmetric input is meaningful.
pub fn symmetric_eigen(sym: &Array2<f64>) -> SymmetricEigen {
    let n = sym.nrows();
    let mut m = sym.to_owned();
    let mut v: Array2<f64> = Array2::eye(n);
    let scale: f64 = m.iter().map(|x| x * x).sum();

    for _ in 0..MAX_SWEEPS {
        if off_diagonal_sq(&m) <= OFF_DIAGONAL_TOLERANCE * scale {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                // smaller root of t² + 2θt - 1 = 0 zeroes m[p, q]
                let theta = 0.5 * (m[[q, q]] - m[[p, p]]) / apq;
                let t = theta.signum() / (theta.abs() + theta.hypot(1.0));
                let cos = 1.0 / t.hypot(1.0);
                let sin = t * cos;

                rotate_columns(&mut m, p, q, cos, sin);
                rotate_rows(&mut m, p, q, cos, sin);
                m[[p, q]] = 0.0;
                m[[q, p]] = 0.0;
                rotate_columns(&mut v, p, q, cos, sin);
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| m[[j, j]].total_cmp(&m[[i, i]]));
    SymmetricEigen {
        values: order.iter().map(|&k| m[[k, k]]).collect(),
        vectors: v.select(Axis(1), &order),
    }
}

/// Singular values of `A`, largest first.
pub fn singular_values(a: &Array2<f64>) -> Array1<f64> {
    symmetric_eigen(&a.t().dot(a))
        .values
        .mapv(|lambda| lambda.max(0.0).sqrt())
}

/// Number of singular values above `rel_cutoff * sigma_max`.
pub fn numerical_rank(a: &Array2<f64>, rel_cutoff: f64) -> usize {
    let sigma = singular_values(a);
    let sigma_max = sigma.get(0).copied().unwrap_or(0.0);
    if sigma_max <= 0.0 {
        return 0;
    }
    sigma.iter().filter(|&&s| s > rel_cutoff * sigma_max).count()
}

/// Pseudoinverse of a normal matrix `AᵀA`.
///
/// Directions whose singular value of `A` falls below
/// `rel_cutoff * sigma_max` are dropped, i.e. eigenvalues below
/// `rel_cutoff² * lambda_max`.
pub fn normal_pinv(normal: &Array2<f64>, rel_cutoff: f64) -> Array2<f64> {
    let n = normal.nrows();
    let eig = symmetric_eigen(normal);
    let lambda_max = eig.values.get(0).copied().unwrap_or(0.0);
    let floor = rel_cutoff * rel_cutoff * lambda_max;

    let mut inv = Array2::zeros((n, n));
    for (k, &lambda) in eig.values.iter().enumerate() {
        if lambda > 0.0 && lambda > floor {
            let col = eig.vectors.column(k).insert_axis(Axis(1));
            inv.scaled_add(1.0 / lambda, &col.dot(&col.t()));
        }
    }
    inv
}

/// Minimum-norm least-squares solution of `A x ≈ b`.
pub fn least_squares(a: &Array2<f64>, b: &Array1<f64>, rel_cutoff: f64) -> Array1<f64> {
    let (normal, rhs) = normal_equations(a, b);
    normal_pinv(&normal, rel_cutoff).dot(&rhs)
}
