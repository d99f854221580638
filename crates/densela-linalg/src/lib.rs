//! Densela Linear Algebra
//!
//! Symmetric eigendecomposition and dense matrix multiplication over `f64`.
//!
//! # Overview
//!
//! - [`eigendec`] / [`EigenSolver`]: eigenvalues and orthonormal
//!   eigenvectors of a real symmetric matrix, by Householder
//!   tridiagonalisation followed by divide and conquer (or implicit QL).
//! - [`matmult`] / [`MatrixMultiplier`]: `A * B` through a
//!   [`BlasProvider`].
//!
//! # Conventions
//!
//! [`Matrix`] stores entries row-major. Eigenvectors are the **columns** of
//! [`EigenResult::evectors`] and are paired index-for-index with the
//! ascending [`EigenResult::evalues`]. Hosts that keep column-major data
//! convert at the boundary with [`Matrix::from_col_major`] and
//! [`Matrix::to_col_major`].
//!
//! Results from divide and conquer agree with other LAPACK-class solvers
//! to working precision, not bit for bit, and eigenvector signs are not
//! normalised.
//!
//! # Features
//!
//! - **openblas**: route GEMM and the level-1 kernels to a system OpenBLAS.
//!   Without it a pure Rust provider is used.
//!
//! # Example
//!
//! ```
//! use densela_linalg::{eigendec, matmult, Matrix};
//!
//! let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
//! let b = Matrix::from_rows(vec![vec![5.0, 6.0], vec![7.0, 8.0]]).unwrap();
//! assert_eq!(matmult(&a, &b).unwrap().to_rows(), vec![vec![19.0, 22.0], vec![43.0, 50.0]]);
//!
//! let s = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 1.0]]).unwrap();
//! let eig = eigendec(&s).unwrap();
//! assert!((eig.evalues[0] + 1.0).abs() < 1e-12);
//! assert!((eig.evalues[1] - 3.0).abs() < 1e-12);
//! ```

#![warn(missing_docs)]

pub mod eigen;
pub mod error;
pub mod matrix;
pub mod multiply;

pub use densela_blas::{BlasProvider, Transpose};
pub use eigen::{
    decompose, EigenMethod, EigenOptions, EigenResult, EigenSolver, SymmetryPolicy, Triangle,
};
pub use error::{DimensionError, LinalgError, NumericError, Result};
pub use matrix::Matrix;
pub use multiply::{multiply, MatrixMultiplier};

/// Eigendecomposition of a symmetric matrix with default options.
///
/// Reads the upper triangle. Eigenvalues are ascending and eigenvector `i`
/// is column `i` of the returned `evectors`.
///
/// # Errors
///
/// - [`DimensionError::NotSquare`] if `m` is not square.
/// - [`NumericError`] on non-finite data or a convergence failure.
pub fn eigendec(m: &Matrix) -> Result<EigenResult> {
    decompose(m)
}

/// Matrix product `a * b`.
///
/// # Errors
///
/// [`DimensionError::InnerMismatch`] if `a.cols() != b.rows()`.
pub fn matmult(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    multiply(a, b)
}
