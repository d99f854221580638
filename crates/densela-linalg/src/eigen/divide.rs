//! Cuppen's divide and conquer for the symmetric tridiagonal eigenproblem.
//!
//! Tearing `T` at row `m` with `beta = T[m][m-1]` gives
//!
//! ```text
//! T = diag(T1, T2) + |beta| u u^T,   u = e_{m-1} + sign(beta) e_m
//! ```
//!
//! where `T1` and `T2` have `|beta|` subtracted from their touching corners.
//! Solving the halves recursively leaves the rank-one update
//! `diag(L1, L2) + rho z z^T` with `z = (last row of Q1, sign * first row of Q2)`.
//! Its eigenvalues are the roots of the secular equation
//!
//! ```text
//! f(lambda) = 1 + rho * sum_j z_j^2 / (d_j - lambda)
//! ```
//!
//! Small `z_j` and near-equal `d_j` are deflated first; the remaining roots
//! are bracketed between consecutive poles. Eigenvectors use the
//! Gu-Eisenstat recomputed `z` so they stay orthogonal when roots cluster.

use crate::error::{NumericError, Result};
use crate::matrix::Matrix;
use densela_blas::{BlasProvider, Transpose};
use tracing::trace;

use super::ql::{implicit_ql, sort_eigenpairs};
use super::tridiagonal::Tridiagonal;

/// Bisection steps allowed per secular root. Each step halves the bracket,
/// so this is far more than any finite bracket needs.
const MAX_SECULAR_ITERATIONS: usize = 2200;

/// Divide-and-conquer solver for a tridiagonal matrix.
pub(crate) struct DivideAndConquer<'a> {
    provider: &'a dyn BlasProvider,
    leaf_size: usize,
    max_iterations: usize,
}

impl<'a> DivideAndConquer<'a> {
    pub fn new(provider: &'a dyn BlasProvider, leaf_size: usize, max_iterations: usize) -> Self {
        Self {
            provider,
            leaf_size: leaf_size.max(1),
            max_iterations,
        }
    }

    /// Eigenvalues in ascending order and the matching eigenvectors of `t`
    /// as columns.
    pub fn solve(&self, t: &Tridiagonal) -> Result<(Vec<f64>, Matrix)> {
        self.solve_block(&t.diag, &t.off)
    }

    fn solve_block(&self, diag: &[f64], off: &[f64]) -> Result<(Vec<f64>, Matrix)> {
        let n = diag.len();
        if n <= self.leaf_size {
            let mut values = diag.to_vec();
            let mut z = Matrix::identity(n);
            implicit_ql(&mut values, off, Some(&mut z), self.max_iterations)?;
            return Ok(sort_eigenpairs(values, z));
        }

        let m = n / 2;
        let beta = off[m - 1];
        let rho = beta.abs();
        let sign = if beta < 0.0 { -1.0 } else { 1.0 };

        let mut top = diag[..m].to_vec();
        top[m - 1] -= rho;
        let mut bottom = diag[m..].to_vec();
        bottom[0] -= rho;

        let (l1, q1) = self.solve_block(&top, &off[..m - 1])?;
        let (l2, q2) = self.solve_block(&bottom, &off[m..])?;

        let mut z = Vec::with_capacity(n);
        z.extend_from_slice(&q1.as_slice()[(m - 1) * m..m * m]);
        z.extend(q2.as_slice()[..n - m].iter().map(|v| sign * v));

        let mut d = l1;
        d.extend_from_slice(&l2);

        let (values, w) = self.rank_one_update(&d, &z, rho)?;
        let vectors = self.block_diagonal_product(&q1, &q2, &w)?;
        Ok((values, vectors))
    }

    /// `diag(Q1, Q2) * W` without forming the block-diagonal matrix.
    fn block_diagonal_product(&self, q1: &Matrix, q2: &Matrix, w: &Matrix) -> Result<Matrix> {
        let m = q1.rows();
        let n = w.rows();
        let mut out = Matrix::zeros(n, n);
        let (w_top, w_bottom) = w.as_slice().split_at(m * n);
        let (out_top, out_bottom) = out.as_mut_slice().split_at_mut(m * n);

        self.gemm(m, n, m, q1.as_slice(), w_top, out_top)?;
        self.gemm(n - m, n, n - m, q2.as_slice(), w_bottom, out_bottom)?;
        Ok(out)
    }

    /// Dense row-major `C = A * B` for `A: m x k`, `B: k x n`.
    fn gemm(&self, m: usize, n: usize, k: usize, a: &[f64], b: &[f64], c: &mut [f64]) -> Result<()> {
        if m == 0 || n == 0 {
            return Ok(());
        }
        self.provider.dgemm(
            Transpose::NoTrans,
            Transpose::NoTrans,
            m,
            n,
            k,
            1.0,
            a,
            k,
            b,
            n,
            0.0,
            c,
            n,
        )?;
        Ok(())
    }

    /// Eigenpairs of `diag(d) + rho z z^T`, ascending.
    pub(crate) fn rank_one_update(&self, d: &[f64], z: &[f64], rho: f64) -> Result<(Vec<f64>, Matrix)> {
        let n = d.len();
        let z_norm_sq: f64 = z.iter().map(|v| v * v).sum();
        let z_norm = z_norm_sq.sqrt();
        let rho = rho * z_norm_sq;

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| d[i].total_cmp(&d[j]));
        let mut ds: Vec<f64> = order.iter().map(|&i| d[i]).collect();
        let mut zs: Vec<f64> = order
            .iter()
            .map(|&i| if z_norm > 0.0 { z[i] / z_norm } else { 0.0 })
            .collect();

        // Columns of `basis` map the sorted, rotated problem back to `d`'s order.
        let mut basis = Matrix::zeros(n, n);
        for (slot, &i) in order.iter().enumerate() {
            basis[(i, slot)] = 1.0;
        }

        let d_max = ds.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        let tol = 8.0 * f64::EPSILON * d_max.max(rho);

        let mut deflated = vec![false; n];
        let mut prev: Option<usize> = None;
        for j in 0..n {
            if rho * zs[j].abs() <= tol {
                deflated[j] = true;
                continue;
            }
            if let Some(i) = prev {
                // Rotate z_i into z_j when the poles are close enough that the
                // off-diagonal term this introduces is negligible.
                let tau = zs[i].hypot(zs[j]);
                let c = zs[j] / tau;
                let s = -zs[i] / tau;
                if ((ds[j] - ds[i]) * c * s).abs() <= tol {
                    let (di, dj) = (ds[i], ds[j]);
                    ds[i] = c * c * di + s * s * dj;
                    ds[j] = s * s * di + c * c * dj;
                    zs[i] = 0.0;
                    zs[j] = tau;
                    rotate_pair(&mut basis, i, j, c, s);
                    deflated[i] = true;
                }
            }
            prev = Some(j);
        }

        let kept: Vec<usize> = (0..n).filter(|&j| !deflated[j]).collect();
        let dk: Vec<f64> = kept.iter().map(|&j| ds[j]).collect();
        let zk: Vec<f64> = kept.iter().map(|&j| zs[j]).collect();
        trace!(n, deflated = n - kept.len(), "rank-one merge");

        let roots = secular_roots(&dk, &zk, rho)?;
        let secular = secular_vectors(&dk, &zk, rho, &roots);

        let k = kept.len();
        let mut mixed = Matrix::zeros(n, k);
        self.gemm(
            n,
            k,
            k,
            basis.select_cols(&kept).as_slice(),
            secular.as_slice(),
            mixed.as_mut_slice(),
        )?;

        let mut pairs: Vec<(f64, Column)> = Vec::with_capacity(n);
        pairs.extend(
            (0..n)
                .filter(|&j| deflated[j])
                .map(|j| (ds[j], Column::Deflated(j))),
        );
        pairs.extend(
            roots
                .iter()
                .enumerate()
                .map(|(r, root)| (root.value(&dk), Column::Secular(r))),
        );
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut w = Matrix::zeros(n, n);
        for (col, &(_, source)) in pairs.iter().enumerate() {
            for row in 0..n {
                w[(row, col)] = match source {
                    Column::Deflated(j) => basis[(row, j)],
                    Column::Secular(r) => mixed[(row, r)],
                };
            }
        }

        Ok((pairs.into_iter().map(|(v, _)| v).collect(), w))
    }
}

/// Where an eigenvector of the merged problem comes from.
#[derive(Clone, Copy, Debug)]
enum Column {
    /// Column of the deflation basis.
    Deflated(usize),
    /// Secular-equation eigenvector, as a column of the mixed product.
    Secular(usize),
}

/// `b_i <- c b_i + s b_j`, `b_j <- -s b_i + c b_j` on columns of `basis`.
fn rotate_pair(basis: &mut Matrix, i: usize, j: usize, c: f64, s: f64) {
    let cols = basis.cols();
    for row in basis.as_mut_slice().chunks_mut(cols) {
        let (bi, bj) = (row[i], row[j]);
        row[i] = c * bi + s * bj;
        row[j] = -s * bi + c * bj;
    }
}

/// A root of the secular equation, stored relative to its nearest pole.
#[derive(Clone, Debug)]
struct SecularRoot {
    /// Index of the pole the root is measured from.
    origin: usize,
    /// `lambda - d[origin]`.
    tau: f64,
    /// `d[q] - lambda` for every pole, computed without cancellation.
    delta: Vec<f64>,
}

impl SecularRoot {
    fn value(&self, d: &[f64]) -> f64 {
        d[self.origin] + self.tau
    }
}

/// All `k` roots of `1 + rho * sum z_q^2 / (d_q - lambda)` for strictly
/// increasing `d`, nonzero `z` and `rho > 0`.
///
/// Root `r` lies in `(d[r], d[r + 1])`, the last one in
/// `(d[k-1], d[k-1] + rho * |z|^2)`. Each is found by bisection on the
/// offset from whichever pole the root is closer to.
fn secular_roots(d: &[f64], z: &[f64], rho: f64) -> Result<Vec<SecularRoot>> {
    let k = d.len();
    let z_sq: Vec<f64> = z.iter().map(|v| v * v).collect();
    let z_sq_sum: f64 = z_sq.iter().sum();

    let secular = |origin: usize, tau: f64| -> f64 {
        let shift = d[origin];
        1.0 + rho
            * d.iter()
                .zip(&z_sq)
                .map(|(&dq, &zq)| zq / ((dq - shift) - tau))
                .sum::<f64>()
    };

    (0..k)
        .map(|r| {
            let (origin, mut lo, mut hi) = if r + 1 == k {
                (r, 0.0, rho * z_sq_sum)
            } else {
                let half = 0.5 * (d[r + 1] - d[r]);
                if secular(r, half) >= 0.0 {
                    (r, 0.0, half)
                } else {
                    (r + 1, -half, 0.0)
                }
            };

            // f is increasing between poles: f(lo) < 0 <= f(hi).
            let mut converged = false;
            for _ in 0..MAX_SECULAR_ITERATIONS {
                let mid = 0.5 * (lo + hi);
                if mid <= lo || mid >= hi || hi - lo <= 2.0 * f64::EPSILON * lo.abs().max(hi.abs()) {
                    converged = true;
                    break;
                }
                if secular(origin, mid) < 0.0 {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            if !converged {
                return Err(NumericError::NoConvergence {
                    index: r,
                    iterations: MAX_SECULAR_ITERATIONS,
                }
                .into());
            }

            // Keep the bracket end away from the origin pole.
            let tau = if origin == r { hi } else { lo };
            let shift = d[origin];
            Ok(SecularRoot {
                origin,
                tau,
                delta: d.iter().map(|&dq| (dq - shift) - tau).collect(),
            })
        })
        .collect()
}

/// Unit eigenvectors of `diag(d) + rho z z^T`, one column per root.
///
/// Uses the Gu-Eisenstat `z_hat` for which the computed roots are exact
/// eigenvalues; `v_r = z_hat / (d - lambda_r)` is then orthogonal to
/// working precision.
fn secular_vectors(d: &[f64], z: &[f64], rho: f64, roots: &[SecularRoot]) -> Matrix {
    let k = d.len();
    let mut v = Matrix::zeros(k, k);
    if k == 0 {
        return v;
    }

    let z_hat: Vec<f64> = (0..k)
        .map(|q| {
            let mut prod = -roots[k - 1].delta[q] / rho;
            for (r, root) in roots.iter().enumerate().take(q) {
                prod *= -root.delta[q] / (d[r] - d[q]);
            }
            for (r, root) in roots.iter().enumerate().take(k - 1).skip(q) {
                prod *= -root.delta[q] / (d[r + 1] - d[q]);
            }
            prod.max(0.0).sqrt().copysign(z[q])
        })
        .collect();

    for (r, root) in roots.iter().enumerate() {
        let col: Vec<f64> = z_hat.iter().zip(&root.delta).map(|(zq, dq)| zq / dq).collect();
        let norm = col.iter().map(|x| x * x).sum::<f64>().sqrt();
        for (q, x) in col.iter().enumerate() {
            v[(q, r)] = x / norm;
        }
    }
    v
}
