//! # densela BLAS providers
//!
//! A trait-based abstraction over Basic Linear Algebra Subprograms (BLAS)
//! so the numeric layer can run on whichever kernel library is present.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    BlasProvider Trait                       │
//! └─────────────────────────────────────────────────────────────┘
//!            ▲                                  ▲
//!            │                                  │
//! ┌──────────┴──────────┐            ┌──────────┴──────────┐
//! │    FallbackBlas     │            │      OpenBlas       │
//! │  (pure Rust, rayon) │            │ (feature "openblas")│
//! └─────────────────────┘            └─────────────────────┘
//! ```
//!
//! All matrices handed to a provider are **row-major** slices with an
//! explicit leading dimension (row stride), so callers can pass sub-blocks
//! of a larger matrix without copying.
//!
//! ## Fallback Strategy
//!
//! When no external BLAS is linked, [`default_provider`] returns the pure
//! Rust [`FallbackBlas`]. Its GEMM splits rows of the output across the
//! rayon pool once the problem is large enough.
//!
//! ## Usage
//!
//! ```rust
//! use densela_blas::{default_provider, Transpose};
//!
//! let provider = default_provider();
//! let a = [1.0, 2.0, 3.0, 4.0];
//! let b = [5.0, 6.0, 7.0, 8.0];
//! let mut c = [0.0; 4];
//! provider
//!     .dgemm(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2, 1.0, &a, 2, &b, 2, 0.0, &mut c, 2)
//!     .unwrap();
//! assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod fallback;
#[cfg(feature = "openblas")]
pub mod openblas;

pub use fallback::FallbackBlas;

use thiserror::Error;

/// Errors that can occur during BLAS operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BlasError {
    /// Operand sizes do not fit the requested operation.
    #[error("dimension mismatch: {operation} requires {expected}, got {actual}")]
    DimensionMismatch {
        /// The operation being performed.
        operation: &'static str,
        /// Expected dimensions.
        expected: String,
        /// Actual dimensions.
        actual: String,
    },

    /// Leading dimension smaller than the stored row length.
    #[error("invalid leading dimension: {ld} for matrix with {cols} columns")]
    InvalidLeadingDimension {
        /// Leading dimension provided.
        ld: usize,
        /// Number of stored columns.
        cols: usize,
    },

    /// BLAS library not available.
    #[error("BLAS library not available: {0}")]
    NotAvailable(String),

    /// Internal BLAS error.
    #[error("BLAS internal error: {0}")]
    Internal(String),
}

/// Result type for BLAS operations.
pub type BlasResult<T> = Result<T, BlasError>;

/// Matrix transpose option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Transpose {
    /// Use the matrix as stored.
    NoTrans = b'N',
    /// Use the transpose of the stored matrix.
    Trans = b'T',
}

impl Transpose {
    /// Convert to the CBLAS constant.
    #[must_use]
    pub const fn to_cblas(self) -> i32 {
        match self {
            Self::NoTrans => 111, // CblasNoTrans
            Self::Trans => 112,   // CblasTrans
        }
    }

    /// Shape of the stored operand for a logical `rows x cols` operand.
    #[must_use]
    pub const fn stored_shape(self, rows: usize, cols: usize) -> (usize, usize) {
        match self {
            Self::NoTrans => (rows, cols),
            Self::Trans => (cols, rows),
        }
    }
}

/// BLAS provider trait.
///
/// Implementations must be thread-safe; a single provider is shared by
/// every solver and multiplier that holds it.
pub trait BlasProvider: Send + Sync {
    /// Get the name of this BLAS provider.
    fn name(&self) -> &'static str;

    /// Check if this provider is available.
    fn is_available(&self) -> bool;

    /// Get the number of threads used by this provider.
    fn num_threads(&self) -> usize;

    /// Set the number of threads.
    fn set_num_threads(&self, n: usize);

    // ========================================================================
    // Level 1 BLAS (vector operations)
    // ========================================================================

    /// Dot product: result = x · y
    fn ddot(&self, x: &[f64], y: &[f64]) -> BlasResult<f64>;

    /// Vector scaling: x = alpha * x
    fn dscal(&self, alpha: f64, x: &mut [f64]) -> BlasResult<()>;

    /// AXPY: y = alpha * x + y
    fn daxpy(&self, alpha: f64, x: &[f64], y: &mut [f64]) -> BlasResult<()>;

    /// Euclidean norm: ||x||_2
    fn dnrm2(&self, x: &[f64]) -> BlasResult<f64>;

    // ========================================================================
    // Level 3 BLAS (matrix operations)
    // ========================================================================

    /// General matrix multiplication: C = alpha * op(A) * op(B) + beta * C
    ///
    /// All operands are row-major.
    ///
    /// # Arguments
    ///
    /// * `trans_a` - Transpose option for A
    /// * `trans_b` - Transpose option for B
    /// * `m` - Number of rows in op(A) and C
    /// * `n` - Number of columns in op(B) and C
    /// * `k` - Number of columns in op(A) and rows in op(B)
    /// * `alpha` - Scalar multiplier for A*B
    /// * `a` - Matrix A
    /// * `lda` - Leading dimension of A
    /// * `b` - Matrix B
    /// * `ldb` - Leading dimension of B
    /// * `beta` - Scalar multiplier for C; when zero, C is overwritten
    /// * `c` - Matrix C (output)
    /// * `ldc` - Leading dimension of C
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
    ) -> BlasResult<()>;
}

impl std::fmt::Debug for dyn BlasProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlasProvider")
            .field("name", &self.name())
            .field("threads", &self.num_threads())
            .finish()
    }
}

/// Get the default BLAS provider.
///
/// Returns OpenBLAS if the `openblas` feature is enabled, otherwise the
/// pure Rust fallback sized to the rayon pool.
#[must_use]
pub fn default_provider() -> Box<dyn BlasProvider> {
    #[cfg(feature = "openblas")]
    let provider: Box<dyn BlasProvider> = Box::new(openblas::OpenBlas::new());

    #[cfg(not(feature = "openblas"))]
    let provider: Box<dyn BlasProvider> =
        Box::new(FallbackBlas::with_threads(rayon::current_num_threads()));

    tracing::debug!(
        provider = provider.name(),
        threads = provider.num_threads(),
        "selected BLAS provider"
    );
    provider
}

/// Threshold for using the provider's GEMM instead of an inline loop.
///
/// For small matrices, dispatch overhead exceeds the benefit.
pub const BLAS_THRESHOLD: usize = 64;

/// Check if the provider should be used for a product of given dimensions.
#[must_use]
pub fn should_use_blas(m: usize, n: usize, k: usize) -> bool {
    m >= BLAS_THRESHOLD || n >= BLAS_THRESHOLD || k >= BLAS_THRESHOLD
}

/// Validate that a row-major operand of `rows x cols` with leading
/// dimension `ld` fits in a slice of length `len`.
pub(crate) fn check_operand(
    operation: &'static str,
    name: &str,
    rows: usize,
    cols: usize,
    ld: usize,
    len: usize,
) -> BlasResult<()> {
    if rows == 0 || cols == 0 {
        return Ok(());
    }
    if ld < cols {
        return Err(BlasError::InvalidLeadingDimension { ld, cols });
    }
    let needed = (rows - 1) * ld + cols;
    if len < needed {
        return Err(BlasError::DimensionMismatch {
            operation,
            expected: format!("{name} with at least {needed} elements"),
            actual: format!("{name}.len={len}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose_to_cblas() {
        assert_eq!(Transpose::NoTrans.to_cblas(), 111);
        assert_eq!(Transpose::Trans.to_cblas(), 112);
    }

    #[test]
    fn test_stored_shape() {
        assert_eq!(Transpose::NoTrans.stored_shape(2, 3), (2, 3));
        assert_eq!(Transpose::Trans.stored_shape(2, 3), (3, 2));
    }

    #[test]
    fn test_should_use_blas() {
        assert!(!should_use_blas(10, 10, 10));
        assert!(should_use_blas(100, 10, 10));
        assert!(should_use_blas(10, 100, 10));
        assert!(should_use_blas(10, 10, 100));
    }

    #[test]
    fn test_check_operand_sub_block() {
        // A 2x2 block at the bottom-right of a 3x3 row-major matrix.
        assert!(check_operand("dgemm", "A", 2, 2, 3, 5).is_ok());
        assert!(check_operand("dgemm", "A", 2, 2, 3, 4).is_err());
    }

    #[test]
    fn test_check_operand_bad_ld() {
        let err = check_operand("dgemm", "A", 2, 3, 2, 100).unwrap_err();
        assert_eq!(err, BlasError::InvalidLeadingDimension { ld: 2, cols: 3 });
    }

    #[test]
    fn test_default_provider_available() {
        let provider = default_provider();
        assert!(provider.is_available());
        assert!(provider.num_threads() >= 1);
    }
}
