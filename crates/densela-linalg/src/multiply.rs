//! Dense matrix multiplication.
//!
//! [`MatrixMultiplier`] validates shapes and hands the product to a
//! [`BlasProvider`]. Products where every dimension is below
//! [`BLAS_THRESHOLD`](densela_blas::BLAS_THRESHOLD) run an inline loop
//! instead, since provider dispatch costs more than it saves there.

use crate::error::{DimensionError, Result};
use crate::matrix::Matrix;
use densela_blas::{default_provider, should_use_blas, BlasProvider, Transpose};
use tracing::trace;

/// Computes matrix products through a BLAS provider.
#[derive(Debug)]
pub struct MatrixMultiplier {
    provider: Box<dyn BlasProvider>,
}

impl Default for MatrixMultiplier {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixMultiplier {
    /// Multiplier backed by [`default_provider`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_provider(default_provider())
    }

    /// Multiplier backed by a specific provider.
    #[must_use]
    pub fn with_provider(provider: Box<dyn BlasProvider>) -> Self {
        Self { provider }
    }

    /// The provider in use.
    #[must_use]
    pub fn provider(&self) -> &dyn BlasProvider {
        self.provider.as_ref()
    }

    /// `A * B` for `A: m x k`, `B: k x n`.
    ///
    /// A zero inner dimension yields an `m x n` zero matrix.
    ///
    /// # Errors
    ///
    /// [`DimensionError::InnerMismatch`] when `A.cols() != B.rows()`.
    pub fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        self.multiply_transposed(a, b, Transpose::NoTrans, Transpose::NoTrans)
    }

    /// `op(A) * op(B)` where `op` optionally transposes its operand.
    ///
    /// # Errors
    ///
    /// [`DimensionError::InnerMismatch`] when the inner dimensions of
    /// `op(A)` and `op(B)` differ.
    pub fn multiply_transposed(
        &self,
        a: &Matrix,
        b: &Matrix,
        trans_a: Transpose,
        trans_b: Transpose,
    ) -> Result<Matrix> {
        let (m, k) = op_shape(a, trans_a);
        let (k2, n) = op_shape(b, trans_b);
        if k != k2 {
            return Err(DimensionError::InnerMismatch {
                left: (m, k),
                right: (k2, n),
            }
            .into());
        }

        let mut c = Matrix::zeros(m, n);
        if m == 0 || n == 0 || k == 0 {
            return Ok(c);
        }

        if should_use_blas(m, n, k) && self.provider.is_available() {
            trace!(m, n, k, provider = self.provider.name(), "dispatching gemm");
            self.provider.dgemm(
                trans_a,
                trans_b,
                m,
                n,
                k,
                1.0,
                a.as_slice(),
                a.cols(),
                b.as_slice(),
                b.cols(),
                0.0,
                c.as_mut_slice(),
                n,
            )?;
        } else {
            matmul_naive(a, b, trans_a, trans_b, &mut c);
        }

        Ok(c)
    }
}

/// Logical shape of `op(x)`.
fn op_shape(x: &Matrix, trans: Transpose) -> (usize, usize) {
    match trans {
        Transpose::NoTrans => x.shape(),
        Transpose::Trans => (x.cols(), x.rows()),
    }
}

#[inline]
fn op_at(x: &Matrix, trans: Transpose, i: usize, j: usize) -> f64 {
    match trans {
        Transpose::NoTrans => x[(i, j)],
        Transpose::Trans => x[(j, i)],
    }
}

/// Naive matrix multiplication for small operands.
fn matmul_naive(a: &Matrix, b: &Matrix, trans_a: Transpose, trans_b: Transpose, c: &mut Matrix) {
    let (m, k) = op_shape(a, trans_a);
    let n = c.cols();

    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0;
            for l in 0..k {
                sum += op_at(a, trans_a, i, l) * op_at(b, trans_b, l, j);
            }
            c[(i, j)] = sum;
        }
    }
}

/// `A * B` using the default provider.
///
/// # Errors
///
/// [`DimensionError::InnerMismatch`] when `A.cols() != B.rows()`.
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    MatrixMultiplier::new().multiply(a, b)
}
