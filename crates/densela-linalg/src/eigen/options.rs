//! Eigensolver configuration.

use serde::{Deserialize, Serialize};

/// Which algorithm diagonalises the tridiagonal matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EigenMethod {
    /// Cuppen divide and conquer; faster on large matrices.
    #[default]
    DivideAndConquer,
    /// Implicit-shift QL over the whole tridiagonal matrix.
    Standard,
}

/// Which triangle of the input is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Triangle {
    /// Entries on and below the diagonal.
    Lower,
    /// Entries on and above the diagonal, as LAPACK `dsyevd` with
    /// `uplo = 'U'` reads them.
    #[default]
    Upper,
}

/// What to do when the ignored triangle disagrees with the read one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymmetryPolicy {
    /// Decompose the matrix mirrored from the read triangle; log a warning.
    #[default]
    Assume,
    /// Fail with `NumericError::NotSymmetric`.
    Reject,
}

/// Options for [`EigenSolver`](super::EigenSolver).
///
/// Every field has a default, so partial configurations deserialize:
///
/// ```
/// use densela_linalg::{EigenMethod, EigenOptions};
///
/// let opts: EigenOptions = serde_json::from_str(r#"{ "method": "standard" }"#).unwrap();
/// assert_eq!(opts.method, EigenMethod::Standard);
/// assert_eq!(opts.leaf_size, EigenOptions::default().leaf_size);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenOptions {
    /// Tridiagonal eigensolver.
    pub method: EigenMethod,
    /// Triangle of the input that is read.
    pub triangle: Triangle,
    /// Handling of asymmetric input.
    pub symmetry: SymmetryPolicy,
    /// Asymmetry tolerated, relative to the largest absolute entry.
    pub symmetry_tolerance: f64,
    /// Largest subproblem divide and conquer hands to QL. Zero is treated
    /// as one.
    pub leaf_size: usize,
    /// QL iterations allowed per eigenvalue. Zero selects the default.
    pub max_iterations: usize,
}

impl Default for EigenOptions {
    fn default() -> Self {
        Self {
            method: EigenMethod::default(),
            triangle: Triangle::default(),
            symmetry: SymmetryPolicy::default(),
            symmetry_tolerance: 1e-10,
            leaf_size: 25,
            max_iterations: 30,
        }
    }
}

impl EigenOptions {
    /// Set the method.
    #[must_use]
    pub fn with_method(mut self, method: EigenMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the triangle that is read.
    #[must_use]
    pub fn with_triangle(mut self, triangle: Triangle) -> Self {
        self.triangle = triangle;
        self
    }

    /// Set the symmetry policy.
    #[must_use]
    pub fn with_symmetry(mut self, symmetry: SymmetryPolicy) -> Self {
        self.symmetry = symmetry;
        self
    }

    /// Set the divide-and-conquer leaf size (clamped to at least 1).
    #[must_use]
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size.max(1);
        self
    }

    /// Set the QL iteration budget per eigenvalue (0 selects the default).
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replace values that would make every solve fail: a zero leaf size
    /// becomes 1 and a zero iteration budget becomes the default.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.leaf_size = self.leaf_size.max(1);
        if self.max_iterations == 0 {
            self.max_iterations = Self::default().max_iterations;
        }
        self
    }
}
