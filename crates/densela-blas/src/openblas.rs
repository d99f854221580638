//! OpenBLAS provider.
//!
//! Enabled with the `openblas` feature; links against the system
//! `libopenblas` and forwards to its CBLAS entry points with row-major
//! layout.

use crate::{check_operand, BlasError, BlasProvider, BlasResult, Transpose};

const CBLAS_ROW_MAJOR: i32 = 101;

#[link(name = "openblas")]
extern "C" {
    fn cblas_ddot(n: i32, x: *const f64, incx: i32, y: *const f64, incy: i32) -> f64;
    fn cblas_dscal(n: i32, alpha: f64, x: *mut f64, incx: i32);
    fn cblas_daxpy(n: i32, alpha: f64, x: *const f64, incx: i32, y: *mut f64, incy: i32);
    fn cblas_dnrm2(n: i32, x: *const f64, incx: i32) -> f64;

    fn cblas_dgemm(
        order: i32,
        trans_a: i32,
        trans_b: i32,
        m: i32,
        n: i32,
        k: i32,
        alpha: f64,
        a: *const f64,
        lda: i32,
        b: *const f64,
        ldb: i32,
        beta: f64,
        c: *mut f64,
        ldc: i32,
    );

    fn openblas_set_num_threads(n: i32);
    fn openblas_get_num_threads() -> i32;
}

fn to_i32(what: &'static str, value: usize) -> BlasResult<i32> {
    i32::try_from(value)
        .map_err(|_| BlasError::Internal(format!("{what}={value} exceeds the CBLAS index range")))
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

/// OpenBLAS provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenBlas;

impl OpenBlas {
    /// Create a new OpenBLAS provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BlasProvider for OpenBlas {
    fn name(&self) -> &'static str {
        "OpenBLAS"
    }

    fn is_available(&self) -> bool {
        true // linked if this module compiles
    }

    fn num_threads(&self) -> usize {
        let n = unsafe { openblas_get_num_threads() };
        usize::try_from(n).unwrap_or(1).max(1)
    }

    fn set_num_threads(&self, n: usize) {
        let n = i32::try_from(n.max(1)).unwrap_or(i32::MAX);
        unsafe { openblas_set_num_threads(n) }
    }

    fn ddot(&self, x: &[f64], y: &[f64]) -> BlasResult<f64> {
        same_length("ddot", x, y)?;
        let n = to_i32("n", x.len())?;
        Ok(unsafe { cblas_ddot(n, x.as_ptr(), 1, y.as_ptr(), 1) })
    }

    fn dscal(&self, alpha: f64, x: &mut [f64]) -> BlasResult<()> {
        let n = to_i32("n", x.len())?;
        unsafe { cblas_dscal(n, alpha, x.as_mut_ptr(), 1) }
        Ok(())
    }

    fn daxpy(&self, alpha: f64, x: &[f64], y: &mut [f64]) -> BlasResult<()> {
        same_length("daxpy", x, y)?;
        let n = to_i32("n", x.len())?;
        unsafe { cblas_daxpy(n, alpha, x.as_ptr(), 1, y.as_mut_ptr(), 1) }
        Ok(())
    }

    fn dnrm2(&self, x: &[f64]) -> BlasResult<f64> {
        let n = to_i32("n", x.len())?;
        Ok(unsafe { cblas_dnrm2(n, x.as_ptr(), 1) })
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

        // CBLAS rejects ld < 1 even for empty operands.
        let (lda, ldb, ldc) = (lda.max(1), ldb.max(1), ldc.max(1));

        unsafe {
            cblas_dgemm(
                CBLAS_ROW_MAJOR,
                trans_a.to_cblas(),
                trans_b.to_cblas(),
                to_i32("m", m)?,
                to_i32("n", n)?,
                to_i32("k", k)?,
                alpha,
                a.as_ptr(),
                to_i32("lda", lda)?,
                b.as_ptr(),
                to_i32("ldb", ldb)?,
                beta,
                c.as_mut_ptr(),
                to_i32("ldc", ldc)?,
            );
        }
        Ok(())
    }
}
