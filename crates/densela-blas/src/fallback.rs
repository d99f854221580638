//! Pure Rust BLAS implementation.
//!
//! Used when no external BLAS library is linked. Level 1 routines are
//! straightforward loops; GEMM walks each output row in i-k-j order so the
//! inner loop streams a contiguous row of B, and splits rows across the
//! rayon pool for large products.

use crate::{check_operand, BlasError, BlasProvider, BlasResult, Transpose};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Minimum `m * n * k` before GEMM fans rows out to rayon.
pub const PARALLEL_WORK_THRESHOLD: usize = 64 * 64 * 64;

/// Pure Rust fallback BLAS implementation.
///
/// Provides correct results everywhere; slower than a tuned library.
#[derive(Debug)]
pub struct FallbackBlas {
    num_threads: AtomicUsize,
}

impl Default for FallbackBlas {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackBlas {
    /// Create a single-threaded fallback provider.
    #[must_use]
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a fallback provider allowed to use `threads` rayon workers.
    #[must_use]
    pub fn with_threads(threads: usize) -> Self {
        Self {
            num_threads: AtomicUsize::new(threads.max(1)),
        }
    }
}

fn same_length(operation: &'static str, x: &[f64], y: &[f64]) -> BlasResult<()> {
    if x.len() != y.len() {
        return Err(BlasError::DimensionMismatch {
            operation,
            expected: "vectors of same length".to_string(),
            actual: format!("x.len={}, y.len={}", x.len(), y.len()),
        });
    }
    Ok(())
}

impl BlasProvider for FallbackBlas {
    fn name(&self) -> &'static str {
        "Fallback (Pure Rust)"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn num_threads(&self) -> usize {
        self.num_threads.load(Ordering::Relaxed)
    }

    fn set_num_threads(&self, n: usize) {
        self.num_threads.store(n.max(1), Ordering::Relaxed);
    }

    fn ddot(&self, x: &[f64], y: &[f64]) -> BlasResult<f64> {
        same_length("ddot", x, y)?;
        Ok(x.iter().zip(y.iter()).map(|(a, b)| a * b).sum())
    }

    fn dscal(&self, alpha: f64, x: &mut [f64]) -> BlasResult<()> {
        for val in x.iter_mut() {
            *val *= alpha;
        }
        Ok(())
    }

    fn daxpy(&self, alpha: f64, x: &[f64], y: &mut [f64]) -> BlasResult<()> {
        same_length("daxpy", x, y)?;
        for (yi, xi) in y.iter_mut().zip(x.iter()) {
            *yi += alpha * xi;
        }
        Ok(())
    }

    fn dnrm2(&self, x: &[f64]) -> BlasResult<f64> {
        // Scaled sum of squares so large entries do not overflow.
        let scale = x.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 || !scale.is_finite() {
            return Ok(scale);
        }
        let sum_sq: f64 = x.iter().map(|v| (v / scale) * (v / scale)).sum();
        Ok(scale * sum_sq.sqrt())
    }

    #[allow(clippy::too_many_arguments)]
    fn dgemm(
        &self,
        trans_a: Transpose,
        trans_b: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: f64,
        a: &[f64],
        lda: usize,
        b: &[f64],
        ldb: usize,
        beta: f64,
        c: &mut [f64],
        ldc: usize,
    ) -> BlasResult<()> {
        let (a_rows, a_cols) = trans_a.stored_shape(m, k);
        let (b_rows, b_cols) = trans_b.stored_shape(k, n);
        check_operand("dgemm", "A", a_rows, a_cols, lda, a.len())?;
        check_operand("dgemm", "B", b_rows, b_cols, ldb, b.len())?;
        check_operand("dgemm", "C", m, n, ldc, c.len())?;

        if m == 0 || n == 0 {
            return Ok(());
        }

        let kernel = RowKernel {
            trans_a,
            trans_b,
            n,
            k,
            alpha,
            a,
            lda,
            b,
            ldb,
            beta,
        };

        let rows = &mut c[..(m - 1) * ldc + n];
        if self.num_threads() > 1 && m > 1 && m * n * k >= PARALLEL_WORK_THRESHOLD {
            rows.par_chunks_mut(ldc)
                .enumerate()
                .for_each(|(i, row)| kernel.run(i, &mut row[..n]));
        } else {
            rows.chunks_mut(ldc)
                .enumerate()
                .for_each(|(i, row)| kernel.run(i, &mut row[..n]));
        }

        Ok(())
    }
}

/// One output row of C = alpha * op(A) * op(B) + beta * C.
struct RowKernel<'a> {
    trans_a: Transpose,
    trans_b: Transpose,
    n: usize,
    k: usize,
    alpha: f64,
    a: &'a [f64],
    lda: usize,
    b: &'a [f64],
    ldb: usize,
    beta: f64,
}

impl RowKernel<'_> {
    #[inline]
    fn a_at(&self, i: usize, l: usize) -> f64 {
        match self.trans_a {
            Transpose::NoTrans => self.a[i * self.lda + l],
            Transpose::Trans => self.a[l * self.lda + i],
        }
    }

    fn run(&self, i: usize, c_row: &mut [f64]) {
        // beta == 0 overwrites, so NaN garbage in C does not leak through.
        if self.beta == 0.0 {
            c_row.fill(0.0);
        } else if self.beta != 1.0 {
            for v in c_row.iter_mut() {
                *v *= self.beta;
            }
        }

        for l in 0..self.k {
            let a_il = self.alpha * self.a_at(i, l);
            if a_il == 0.0 {
                continue;
            }
            match self.trans_b {
                Transpose::NoTrans => {
                    let b_row = &self.b[l * self.ldb..l * self.ldb + self.n];
                    for (cj, bj) in c_row.iter_mut().zip(b_row) {
                        *cj += a_il * bj;
                    }
                }
                Transpose::Trans => {
                    for (j, cj) in c_row.iter_mut().enumerate() {
                        *cj += a_il * self.b[j * self.ldb + l];
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_provider() -> FallbackBlas {
        FallbackBlas::new()
    }

    #[test]
    fn test_fallback_ddot() {
        let provider = get_provider();
        let result = provider.ddot(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((result - 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_fallback_ddot_mismatch() {
        let provider = get_provider();
        let err = provider.ddot(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, BlasError::DimensionMismatch { operation: "ddot", .. }));
    }

    #[test]
    fn test_fallback_dscal() {
        let provider = get_provider();
        let mut x = [1.0, 2.0, 3.0, 4.0];
        provider.dscal(2.0, &mut x).unwrap();
        assert_eq!(x, [2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_fallback_daxpy() {
        let provider = get_provider();
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut y = [10.0, 20.0, 30.0, 40.0];
        provider.daxpy(2.0, &x, &mut y).unwrap();
        assert_eq!(y, [12.0, 24.0, 36.0, 48.0]);
    }

    #[test]
    fn test_fallback_dnrm2() {
        let provider = get_provider();
        assert!((provider.dnrm2(&[3.0, 4.0]).unwrap() - 5.0).abs() < 1e-12);
        assert_eq!(provider.dnrm2(&[]).unwrap(), 0.0);
    }

    #[test]
    fn test_fallback_dnrm2_no_overflow() {
        let provider = get_provider();
        let big = 1e200;
        let norm = provider.dnrm2(&[big, big]).unwrap();
        assert!(norm.is_finite());
        assert!((norm / big - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_fallback_dgemm() {
        let provider = get_provider();

        // 2x3 * 3x2 = 2x2
        let a = [
            1.0, 2.0, 3.0, // row 0
            4.0, 5.0, 6.0, // row 1
        ];
        let b = [
            7.0, 8.0, // row 0
            9.0, 10.0, // row 1
            11.0, 12.0, // row 2
        ];
        let mut c = [0.0; 4];

        provider
            .dgemm(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 3, 1.0, &a, 3, &b, 2, 0.0, &mut c, 2)
            .unwrap();

        assert_eq!(c, [58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_fallback_dgemm_transposed() {
        let provider = get_provider();

        // A^T where A is stored 3x2, B^T where B is stored 2x3.
        let a = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        let b = [7.0, 9.0, 11.0, 8.0, 10.0, 12.0];
        let mut c = [0.0; 4];

        provider
            .dgemm(Transpose::Trans, Transpose::Trans, 2, 2, 3, 1.0, &a, 2, &b, 3, 0.0, &mut c, 2)
            .unwrap();

        assert_eq!(c, [58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_fallback_dgemm_alpha_beta() {
        let provider = get_provider();
        let a = [1.0, 0.0, 0.0, 1.0];
        let b = [1.0, 2.0, 3.0, 4.0];
        let mut c = [1.0, 1.0, 1.0, 1.0];

        provider
            .dgemm(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2, 2.0, &a, 2, &b, 2, 3.0, &mut c, 2)
            .unwrap();

        assert_eq!(c, [5.0, 7.0, 9.0, 11.0]);
    }

    #[test]
    fn test_fallback_dgemm_beta_zero_ignores_nan() {
        let provider = get_provider();
        let a = [1.0];
        let b = [2.0];
        let mut c = [f64::NAN];

        provider
            .dgemm(Transpose::NoTrans, Transpose::NoTrans, 1, 1, 1, 1.0, &a, 1, &b, 1, 0.0, &mut c, 1)
            .unwrap();

        assert_eq!(c, [2.0]);
    }

    #[test]
    fn test_fallback_dgemm_sub_block() {
        let provider = get_provider();

        // Multiply the trailing 2x2 blocks of two 3x3 matrices in place.
        let a = [9.0, 9.0, 9.0, 9.0, 1.0, 2.0, 9.0, 3.0, 4.0];
        let b = [9.0, 9.0, 9.0, 9.0, 5.0, 6.0, 9.0, 7.0, 8.0];
        let mut c = [0.0; 9];

        provider
            .dgemm(
                Transpose::NoTrans,
                Transpose::NoTrans,
                2,
                2,
                2,
                1.0,
                &a[4..],
                3,
                &b[4..],
                3,
                0.0,
                &mut c[4..],
                3,
            )
            .unwrap();

        assert_eq!(c, [0.0, 0.0, 0.0, 0.0, 19.0, 22.0, 0.0, 43.0, 50.0]);
    }

    #[test]
    fn test_fallback_dgemm_short_buffer() {
        let provider = get_provider();
        let a = [1.0, 2.0, 3.0];
        let b = [1.0; 4];
        let mut c = [0.0; 4];

        let err = provider
            .dgemm(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2, 1.0, &a, 2, &b, 2, 0.0, &mut c, 2)
            .unwrap_err();

        assert!(matches!(err, BlasError::DimensionMismatch { operation: "dgemm", .. }));
    }

    #[test]
    fn test_fallback_dgemm_parallel_matches_serial() {
        let serial = FallbackBlas::new();
        let parallel = FallbackBlas::with_threads(4);

        let (m, n, k) = (70, 65, 80);
        let a: Vec<f64> = (0..m * k).map(|i| ((i * 7) % 13) as f64 - 6.0).collect();
        let b: Vec<f64> = (0..k * n).map(|i| ((i * 5) % 11) as f64 - 5.0).collect();
        let mut c1 = vec![0.0; m * n];
        let mut c2 = vec![0.0; m * n];

        serial
            .dgemm(Transpose::NoTrans, Transpose::NoTrans, m, n, k, 1.0, &a, k, &b, n, 0.0, &mut c1, n)
            .unwrap();
        parallel
            .dgemm(Transpose::NoTrans, Transpose::NoTrans, m, n, k, 1.0, &a, k, &b, n, 0.0, &mut c2, n)
            .unwrap();

        assert_eq!(c1, c2);
    }

    #[test]
    fn test_thread_setting() {
        let provider = get_provider();
        assert_eq!(provider.num_threads(), 1);
        provider.set_num_threads(8);
        assert_eq!(provider.num_threads(), 8);
        provider.set_num_threads(0);
        assert_eq!(provider.num_threads(), 1);
    }

    #[test]
    fn test_provider_name() {
        let provider = get_provider();
        assert_eq!(provider.name(), "Fallback (Pure Rust)");
    }
}
