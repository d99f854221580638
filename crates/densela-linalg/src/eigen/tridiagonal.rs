//! Householder reduction of a symmetric matrix to tridiagonal form.
//!
//! Produces `A = Q T Q^T` with `Q = H_0 H_1 ... H_{n-3}` orthogonal and `T`
//! symmetric tridiagonal. Each reflector `H_k = I - 2 v v^T` zeroes column
//! `k` below the subdiagonal; the trailing block is updated with the
//! symmetric rank-two form `B - 2 v w^T - 2 w v^T`, `w = Bv - (v^T B v) v`.

use crate::error::Result;
use crate::matrix::Matrix;
use densela_blas::BlasProvider;

/// A symmetric tridiagonal matrix.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Tridiagonal {
    /// Main diagonal, length `n`.
    pub diag: Vec<f64>,
    /// Subdiagonal, length `n - 1`: `off[i] = T[i + 1][i]`.
    pub off: Vec<f64>,
}

impl Tridiagonal {
    /// Divide every entry by the largest magnitude, returning that factor
    /// (1 for the zero matrix).
    pub fn normalize(&mut self) -> f64 {
        let scale = self
            .diag
            .iter()
            .chain(self.off.iter())
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 || scale == 1.0 {
            return 1.0;
        }
        for v in self.diag.iter_mut().chain(self.off.iter_mut()) {
            *v /= scale;
        }
        scale
    }

    #[cfg(test)]
    pub fn to_matrix(&self) -> Matrix {
        let n = self.diag.len();
        let mut t = Matrix::diagonal(&self.diag);
        for (i, &e) in self.off.iter().enumerate() {
            t[(i + 1, i)] = e;
            t[(i, i + 1)] = e;
        }
        debug_assert_eq!(t.rows(), n);
        t
    }
}

/// Reduce `a` (full symmetric storage) and return `T` together with `Q`.
pub(crate) fn tridiagonalize(a: Matrix, provider: &dyn BlasProvider) -> Result<(Tridiagonal, Matrix)> {
    let mut q = Matrix::identity(a.rows());
    let t = reduce(a, provider, Some(&mut q))?;
    Ok((t, q))
}

/// Reduce `a` without accumulating `Q`.
pub(crate) fn tridiagonalize_values(a: Matrix, provider: &dyn BlasProvider) -> Result<Tridiagonal> {
    reduce(a, provider, None)
}

fn reduce(mut a: Matrix, provider: &dyn BlasProvider, mut q: Option<&mut Matrix>) -> Result<Tridiagonal> {
    let n = a.rows();
    let mut hv = vec![0.0; n];
    let mut pw = vec![0.0; n];

    for k in 0..n.saturating_sub(2) {
        let t = n - k - 1;

        // Column k below the diagonal equals row k right of it.
        let x = &a.as_slice()[k * n + k + 1..(k + 1) * n];
        let norm = provider.dnrm2(x)?;
        if norm == 0.0 {
            continue;
        }
        let alpha = if x[0] > 0.0 { -norm } else { norm };

        let v = &mut hv[..t];
        v.copy_from_slice(x);
        v[0] -= alpha;
        let v_norm = provider.dnrm2(v)?;
        if v_norm == 0.0 {
            continue;
        }
        provider.dscal(1.0 / v_norm, v)?;

        let data = a.as_mut_slice();
        let p = &mut pw[..t];
        for (i, pi) in p.iter_mut().enumerate() {
            let start = (k + 1 + i) * n + k + 1;
            *pi = provider.ddot(&data[start..start + t], v)?;
        }
        let vbv = provider.ddot(v, p)?;
        provider.daxpy(-vbv, v, p)?;

        for i in 0..t {
            let start = (k + 1 + i) * n + k + 1;
            let row = &mut data[start..start + t];
            provider.daxpy(-2.0 * v[i], p, row)?;
            provider.daxpy(-2.0 * p[i], v, row)?;
        }

        data[k * n + k + 1] = alpha;
        data[(k + 1) * n + k] = alpha;
        for j in k + 2..n {
            data[k * n + j] = 0.0;
            data[j * n + k] = 0.0;
        }

        if let Some(q) = q.as_deref_mut() {
            let qd = q.as_mut_slice();
            for r in 0..n {
                let row = &mut qd[r * n + k + 1..(r + 1) * n];
                let s = provider.ddot(row, v)?;
                provider.daxpy(-2.0 * s, v, row)?;
            }
        }
    }

    let data = a.as_slice();
    Ok(Tridiagonal {
        diag: (0..n).map(|i| data[i * n + i]).collect(),
        off: (0..n.saturating_sub(1)).map(|i| data[(i + 1) * n + i]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiply::MatrixMultiplier;
    use densela_blas::{FallbackBlas, Transpose};

    fn sample() -> Matrix {
        Matrix::from_rows(vec![
            vec![4.0, 1.0, -2.0, 2.0],
            vec![1.0, 2.0, 0.0, 1.0],
            vec![-2.0, 0.0, 3.0, -2.0],
            vec![2.0, 1.0, -2.0, -1.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_reconstructs_input() {
        let provider = FallbackBlas::new();
        let a = sample();
        let (t, q) = tridiagonalize(a.clone(), &provider).unwrap();

        let mult = MatrixMultiplier::with_provider(Box::new(FallbackBlas::new()));
        let qt = mult.multiply(&q, &t.to_matrix()).unwrap();
        let qtq = mult
            .multiply_transposed(&qt, &q, Transpose::NoTrans, Transpose::Trans)
            .unwrap();

        assert!(qtq.approx_eq(&a, 1e-12), "Q T Q^T = {qtq}");
    }

    #[test]
    fn test_q_is_orthogonal() {
        let provider = FallbackBlas::new();
        let (_, q) = tridiagonalize(sample(), &provider).unwrap();
        let mult = MatrixMultiplier::with_provider(Box::new(FallbackBlas::new()));
        let qtq = mult
            .multiply_transposed(&q, &q, Transpose::Trans, Transpose::NoTrans)
            .unwrap();
        assert!(qtq.approx_eq(&Matrix::identity(4), 1e-12));
    }

    #[test]
    fn test_values_only_matches() {
        let provider = FallbackBlas::new();
        let (t, _) = tridiagonalize(sample(), &provider).unwrap();
        let t2 = tridiagonalize_values(sample(), &provider).unwrap();
        assert_eq!(t, t2);
    }

    #[test]
    fn test_already_tridiagonal_is_untouched() {
        let provider = FallbackBlas::new();
        let a = Matrix::from_rows(vec![
            vec![2.0, -1.0, 0.0],
            vec![-1.0, 2.0, -1.0],
            vec![0.0, -1.0, 2.0],
        ])
        .unwrap();
        let (t, q) = tridiagonalize(a, &provider).unwrap();
        // Only column 0 is reflected; it already has a single subdiagonal entry.
        assert_eq!(t.diag.len(), 3);
        assert_eq!(t.off.len(), 2);
        assert!((t.off[0].abs() - 1.0).abs() < 1e-15);
        assert!((q[(0, 0)] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_normalize() {
        let mut t = Tridiagonal {
            diag: vec![4.0, -8.0],
            off: vec![2.0],
        };
        assert_eq!(t.normalize(), 8.0);
        assert_eq!(t.diag, vec![0.5, -1.0]);
        assert_eq!(t.off, vec![0.25]);

        let mut zero = Tridiagonal {
            diag: vec![0.0],
            off: vec![],
        };
        assert_eq!(zero.normalize(), 1.0);
    }
}
