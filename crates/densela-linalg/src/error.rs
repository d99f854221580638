//! Error types for linear algebra operations.

use densela_blas::BlasError;
use thiserror::Error;

/// Shape problems detected before any arithmetic runs.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DimensionError {
    /// A square matrix was required.
    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare {
        /// Row count of the offending matrix.
        rows: usize,
        /// Column count of the offending matrix.
        cols: usize,
    },

    /// Inner dimensions of a product do not agree.
    #[error("inner dimensions do not match: {left:?} * {right:?}")]
    InnerMismatch {
        /// Shape of the left operand.
        left: (usize, usize),
        /// Shape of the right operand.
        right: (usize, usize),
    },

    /// Flat data does not fill the requested shape.
    #[error("data length {actual} does not fill a matrix of {expected} elements")]
    DataLength {
        /// `rows * cols`.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// Nested rows of unequal length.
    #[error("row {row} has {actual} elements, expected {expected}")]
    RaggedRows {
        /// Index of the first row whose length differs from row 0.
        row: usize,
        /// Length of row 0.
        expected: usize,
        /// Length of the offending row.
        actual: usize,
    },
}

/// Failures of the numeric algorithms themselves.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum NumericError {
    /// An iterative step ran out of iterations.
    #[error("eigensolver failed to converge for eigenvalue {index} after {iterations} iterations")]
    NoConvergence {
        /// Index of the eigenvalue being isolated.
        index: usize,
        /// Iterations spent.
        iterations: usize,
    },

    /// NaN or infinity in the input or the computed result.
    #[error("non-finite values in {stage}")]
    NonFinite {
        /// Where the values were found (`"input"` or `"output"`).
        stage: &'static str,
    },

    /// The two triangles of a matrix disagree beyond tolerance.
    #[error("matrix is not symmetric: entries ({row}, {col}) differ by {difference:.3e}")]
    NotSymmetric {
        /// Row of the worst mismatch.
        row: usize,
        /// Column of the worst mismatch.
        col: usize,
        /// Absolute difference `|a[row][col] - a[col][row]|`.
        difference: f64,
    },
}

/// Main error type for densela operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LinalgError {
    /// Shape mismatch.
    #[error(transparent)]
    Dimension(#[from] DimensionError),

    /// Numeric failure.
    #[error(transparent)]
    Numeric(#[from] NumericError),

    /// The BLAS provider rejected a call.
    #[error("BLAS error: {0}")]
    Blas(#[from] BlasError),
}

impl LinalgError {
    /// Returns true for shape errors.
    #[must_use]
    pub fn is_dimension_error(&self) -> bool {
        matches!(self, Self::Dimension(_))
    }

    /// Returns true for numeric failures.
    #[must_use]
    pub fn is_numeric_error(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }
}

/// Result type for densela operations.
pub type Result<T> = std::result::Result<T, LinalgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_messages() {
        let err = LinalgError::from(DimensionError::NotSquare { rows: 2, cols: 3 });
        assert_eq!(err.to_string(), "matrix must be square, got 2x3");
        assert!(err.is_dimension_error());

        let err = LinalgError::from(DimensionError::InnerMismatch {
            left: (2, 3),
            right: (2, 2),
        });
        assert_eq!(err.to_string(), "inner dimensions do not match: (2, 3) * (2, 2)");

        let err = LinalgError::from(DimensionError::RaggedRows {
            row: 1,
            expected: 2,
            actual: 1,
        });
        assert_eq!(err.to_string(), "row 1 has 1 elements, expected 2");
    }

    #[test]
    fn test_numeric_messages() {
        let err = LinalgError::from(NumericError::NonFinite { stage: "input" });
        assert_eq!(err.to_string(), "non-finite values in input");
        assert!(err.is_numeric_error());
        assert!(!err.is_dimension_error());
    }

    #[test]
    fn test_blas_conversion() {
        let err = LinalgError::from(BlasError::NotAvailable("mkl".to_string()));
        assert!(matches!(err, LinalgError::Blas(_)));
        assert_eq!(err.to_string(), "BLAS error: BLAS library not available: mkl");
    }
}
