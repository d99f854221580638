//! Symmetric eigendecomposition.
//!
//! The pipeline is the classical one:
//!
//! 1. Mirror the selected triangle into a full symmetric working copy.
//! 2. Householder-reduce it to tridiagonal form, `A = Q T Q^T`.
//! 3. Diagonalise `T = Z L Z^T` by divide and conquer or by implicit QL.
//! 4. Back-transform, `V = Q Z`, through the BLAS provider.
//!
//! Eigenvalues come back ascending; eigenvector `i` is column `i` of
//! [`EigenResult::evectors`]. The sign of each eigenvector is whatever the
//! algorithm produces.

mod divide;
mod options;
mod ql;
mod tridiagonal;

pub use options::{EigenMethod, EigenOptions, SymmetryPolicy, Triangle};

use crate::error::{DimensionError, NumericError, Result};
use crate::matrix::Matrix;
use crate::multiply::MatrixMultiplier;
use densela_blas::{default_provider, BlasProvider, Transpose};
use tracing::{debug, instrument, warn};

use divide::DivideAndConquer;
use ql::{implicit_ql, sort_eigenpairs};
use tridiagonal::{tridiagonalize, tridiagonalize_values};

/// Eigenvalues and eigenvectors of a symmetric matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct EigenResult {
    /// Eigenvalues, ascending.
    pub evalues: Vec<f64>,
    /// Orthonormal eigenvectors stored as columns, `n x n`.
    pub evectors: Matrix,
}

impl EigenResult {
    /// Number of eigenpairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.evalues.len()
    }

    /// True for the decomposition of a 0x0 matrix.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.evalues.is_empty()
    }

    /// Eigenvector paired with `evalues[i]`.
    #[must_use]
    pub fn evector(&self, i: usize) -> Option<Vec<f64>> {
        self.evectors.col(i)
    }

    /// `V diag(L) V^T`, which should reproduce the symmetrised input.
    ///
    /// Uses a multiplier backed by [`default_provider`]; see
    /// [`reconstruct_with`](Self::reconstruct_with) to choose one.
    ///
    /// # Errors
    ///
    /// Propagates provider failures from the product.
    pub fn reconstruct(&self) -> Result<Matrix> {
        self.reconstruct_with(&MatrixMultiplier::new())
    }

    /// `V diag(L) V^T` computed by `multiplier`.
    ///
    /// # Errors
    ///
    /// Propagates provider failures from the product.
    pub fn reconstruct_with(&self, multiplier: &MatrixMultiplier) -> Result<Matrix> {
        let scaled = self.evectors.scale_cols(&self.evalues);
        multiplier.multiply_transposed(&scaled, &self.evectors, Transpose::NoTrans, Transpose::Trans)
    }
}

/// Symmetric eigensolver.
///
/// ```
/// use densela_linalg::{EigenSolver, Matrix};
///
/// let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 1.0]]).unwrap();
/// let eig = EigenSolver::default().decompose(&m).unwrap();
///
/// assert!((eig.evalues[0] + 1.0).abs() < 1e-12);
/// assert!((eig.evalues[1] - 3.0).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct EigenSolver {
    options: EigenOptions,
    multiplier: MatrixMultiplier,
}

impl Default for EigenSolver {
    fn default() -> Self {
        Self::new(EigenOptions::default())
    }
}

impl EigenSolver {
    /// Solver backed by [`default_provider`].
    #[must_use]
    pub fn new(options: EigenOptions) -> Self {
        Self::with_provider(options, default_provider())
    }

    /// Solver backed by a specific provider.
    ///
    /// Zero `leaf_size` or `max_iterations` are replaced as described on
    /// [`EigenOptions::sanitized`].
    #[must_use]
    pub fn with_provider(options: EigenOptions, provider: Box<dyn BlasProvider>) -> Self {
        Self {
            options: options.sanitized(),
            multiplier: MatrixMultiplier::with_provider(provider),
        }
    }

    /// The options in use.
    #[must_use]
    pub fn options(&self) -> &EigenOptions {
        &self.options
    }

    /// The multiplier used for the back-transform.
    #[must_use]
    pub fn multiplier(&self) -> &MatrixMultiplier {
        &self.multiplier
    }

    fn provider(&self) -> &dyn BlasProvider {
        self.multiplier.provider()
    }

    /// Eigenvalues (ascending) and orthonormal eigenvectors of `m`.
    ///
    /// Only the triangle selected by [`EigenOptions::triangle`] is read.
    ///
    /// # Errors
    ///
    /// - [`DimensionError::NotSquare`] for a non-square input.
    /// - [`NumericError::NonFinite`] for NaN or infinite entries.
    /// - [`NumericError::NotSymmetric`] under [`SymmetryPolicy::Reject`].
    /// - [`NumericError::NoConvergence`] if an iteration limit is hit.
    #[instrument(skip_all, fields(n = m.rows(), method = ?self.options.method))]
    pub fn decompose(&self, m: &Matrix) -> Result<EigenResult> {
        let a = self.prepare(m)?;
        let n = a.rows();
        if n == 0 {
            return Ok(EigenResult {
                evalues: Vec::new(),
                evectors: Matrix::zeros(0, 0),
            });
        }

        let (mut t, q) = tridiagonalize(a, self.provider())?;
        let scale = t.normalize();

        let (mut evalues, z) = match self.options.method {
            EigenMethod::DivideAndConquer => DivideAndConquer::new(
                self.provider(),
                self.options.leaf_size,
                self.options.max_iterations,
            )
            .solve(&t)?,
            EigenMethod::Standard => {
                let mut values = t.diag.clone();
                let mut z = Matrix::identity(n);
                implicit_ql(&mut values, &t.off, Some(&mut z), self.options.max_iterations)?;
                sort_eigenpairs(values, z)
            }
        };
        for v in &mut evalues {
            *v *= scale;
        }

        let evectors = self.multiplier.multiply(&q, &z)?;
        check_output(&evalues, Some(&evectors))?;

        debug!(n, scale, "eigendecomposition complete");
        Ok(EigenResult { evalues, evectors })
    }

    /// Eigenvalues only, ascending.
    ///
    /// Skips accumulating `Q` and uses QL regardless of
    /// [`EigenOptions::method`], since without vectors the merge step of
    /// divide and conquer has nothing to save.
    ///
    /// # Errors
    ///
    /// As [`decompose`](Self::decompose).
    #[instrument(skip_all, fields(n = m.rows()))]
    pub fn eigenvalues(&self, m: &Matrix) -> Result<Vec<f64>> {
        let a = self.prepare(m)?;
        if a.rows() == 0 {
            return Ok(Vec::new());
        }

        let mut t = tridiagonalize_values(a, self.provider())?;
        let scale = t.normalize();
        let mut values = t.diag;
        implicit_ql(&mut values, &t.off, None, self.options.max_iterations)?;
        values.sort_by(f64::total_cmp);
        for v in &mut values {
            *v *= scale;
        }

        check_output(&values, None)?;
        Ok(values)
    }

    /// Validate `m` and build the full symmetric matrix from one triangle.
    fn prepare(&self, m: &Matrix) -> Result<Matrix> {
        if !m.is_square() {
            return Err(DimensionError::NotSquare {
                rows: m.rows(),
                cols: m.cols(),
            }
            .into());
        }
        if !m.is_finite() {
            return Err(NumericError::NonFinite { stage: "input" }.into());
        }

        if let Some((row, col, difference)) = m.max_asymmetry() {
            if difference > self.options.symmetry_tolerance * m.max_abs() {
                match self.options.symmetry {
                    SymmetryPolicy::Reject => {
                        return Err(NumericError::NotSymmetric {
                            row,
                            col,
                            difference,
                        }
                        .into());
                    }
                    SymmetryPolicy::Assume => warn!(
                        row,
                        col,
                        difference,
                        triangle = ?self.options.triangle,
                        "input is not symmetric; using the selected triangle"
                    ),
                }
            }
        }

        let n = m.rows();
        let mut a = Matrix::zeros(n, n);
        for i in 0..n {
            a[(i, i)] = m[(i, i)];
            for j in 0..i {
                let v = match self.options.triangle {
                    Triangle::Lower => m[(i, j)],
                    Triangle::Upper => m[(j, i)],
                };
                a[(i, j)] = v;
                a[(j, i)] = v;
            }
        }
        Ok(a)
    }
}

fn check_output(values: &[f64], vectors: Option<&Matrix>) -> Result<()> {
    let finite = values.iter().all(|v| v.is_finite()) && vectors.map_or(true, Matrix::is_finite);
    if finite {
        Ok(())
    } else {
        Err(NumericError::NonFinite { stage: "output" }.into())
    }
}

/// Decompose `m` with default options.
///
/// # Errors
///
/// See [`EigenSolver::decompose`].
pub fn decompose(m: &Matrix) -> Result<EigenResult> {
    EigenSolver::default().decompose(m)
}
