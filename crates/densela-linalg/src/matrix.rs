//! Dense real matrices
//!
//! # Overview
//!
//! [`Matrix`] is a dense, two-dimensional `f64` array stored in
//! **row-major** order: element `(i, j)` lives at `i * cols + j` in the
//! backing slice. Hosts that hold column-major data (Fortran, R, Julia)
//! convert with [`Matrix::from_col_major`] and [`Matrix::to_col_major`].
//!
//! Matrices are values: every operation in this crate borrows its inputs
//! and returns freshly allocated results.

use crate::error::{DimensionError, Result};
use std::fmt;
use std::ops::{Index, IndexMut};

// ============================================================
// Core Matrix Type
// ============================================================

/// A dense row-major matrix of `f64`.
#[derive(Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Create a matrix from row-major data.
    ///
    /// # Errors
    ///
    /// Returns [`DimensionError::DataLength`] if `data.len() != rows * cols`.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        check_len(data.len(), rows, cols)?;
        Ok(Self { data, rows, cols })
    }

    /// Create a matrix from column-major data.
    ///
    /// # Errors
    ///
    /// Returns [`DimensionError::DataLength`] if `data.len() != rows * cols`.
    pub fn from_col_major(data: &[f64], rows: usize, cols: usize) -> Result<Self> {
        check_len(data.len(), rows, cols)?;
        let mut out = Vec::with_capacity(data.len());
        for r in 0..rows {
            out.extend((0..cols).map(|c| data[c * rows + r]));
        }
        Ok(Self {
            data: out,
            rows,
            cols,
        })
    }

    /// Create from nested vectors, one per row.
    ///
    /// # Errors
    ///
    /// Returns [`DimensionError::RaggedRows`] if a row's length differs from
    /// the first row's.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map_or(0, Vec::len);
        if let Some((row, bad)) = rows.iter().enumerate().find(|(_, r)| r.len() != num_cols) {
            return Err(DimensionError::RaggedRows {
                row,
                expected: num_cols,
                actual: bad.len(),
            }
            .into());
        }
        let data: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Self {
            data,
            rows: num_rows,
            cols: num_cols,
        })
    }

    /// Create a matrix of zeros
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Create an identity matrix
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Create a diagonal matrix from a slice
    #[must_use]
    pub fn diagonal(diag: &[f64]) -> Self {
        let n = diag.len();
        let mut m = Self::zeros(n, n);
        for (i, &val) in diag.iter().enumerate() {
            m.data[i * n + i] = val;
        }
        m
    }

    /// Get the number of rows
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get the shape as (rows, cols)
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Get the total number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Check if the matrix has no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the matrix is square
    #[must_use]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Row-major view of the data
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable row-major view of the data
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consume the matrix, returning its row-major data
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Copy out in column-major order.
    #[must_use]
    pub fn to_col_major(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len());
        for c in 0..self.cols {
            out.extend((0..self.rows).map(|r| self.data[r * self.cols + c]));
        }
        out
    }

    /// Get an element by (row, col)
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    /// Get a row as a slice
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        (row < self.rows).then(|| &self.data[row * self.cols..(row + 1) * self.cols])
    }

    /// Get a mutable row
    pub fn row_mut(&mut self, row: usize) -> Option<&mut [f64]> {
        if row < self.rows {
            let cols = self.cols;
            Some(&mut self.data[row * cols..(row + 1) * cols])
        } else {
            None
        }
    }

    /// Get a column (copied, since storage is row-major)
    #[must_use]
    pub fn col(&self, col: usize) -> Option<Vec<f64>> {
        (col < self.cols).then(|| (0..self.rows).map(|r| self.data[r * self.cols + col]).collect())
    }

    /// Transpose the matrix
    #[must_use]
    pub fn transpose(&self) -> Self {
        Self {
            data: self.to_col_major(),
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Convert to nested vectors
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows)
            .map(|r| self.data[r * self.cols..(r + 1) * self.cols].to_vec())
            .collect()
    }

    /// Swap two columns in place.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn swap_cols(&mut self, a: usize, b: usize) {
        assert!(a < self.cols && b < self.cols, "column index out of bounds");
        if a == b {
            return;
        }
        for r in 0..self.rows {
            self.data.swap(r * self.cols + a, r * self.cols + b);
        }
    }

    /// Reorder columns so that column `j` of the result is column
    /// `order[j]` of `self`.
    #[must_use]
    pub fn select_cols(&self, order: &[usize]) -> Self {
        let mut out = Self::zeros(self.rows, order.len());
        for r in 0..self.rows {
            for (j, &src) in order.iter().enumerate() {
                out.data[r * order.len() + j] = self.data[r * self.cols + src];
            }
        }
        out
    }

    /// Multiply column `j` by `factors[j]` for every column.
    #[must_use]
    pub fn scale_cols(&self, factors: &[f64]) -> Self {
        let mut out = self.clone();
        for row in out.data.chunks_mut(self.cols.max(1)) {
            for (v, f) in row.iter_mut().zip(factors) {
                *v *= f;
            }
        }
        out
    }

    // ============================================================
    // Queries
    // ============================================================

    /// Largest absolute entry (0 for an empty matrix)
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }

    /// Frobenius norm
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|&x| x * x).sum::<f64>().sqrt()
    }

    /// True if no entry is NaN or infinite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Element-wise comparison within an absolute tolerance.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= tol)
    }

    /// Worst disagreement between the two triangles, as `(row, col, |a_rc - a_cr|)`
    /// with `row > col`. `None` for non-square or smaller than 2x2 matrices.
    #[must_use]
    pub fn max_asymmetry(&self) -> Option<(usize, usize, f64)> {
        if !self.is_square() || self.rows < 2 {
            return None;
        }
        let n = self.rows;
        let mut worst = (1, 0, 0.0f64);
        for i in 1..n {
            for j in 0..i {
                let diff = (self.data[i * n + j] - self.data[j * n + i]).abs();
                if diff > worst.2 {
                    worst = (i, j, diff);
                }
            }
        }
        Some(worst)
    }

    /// Check symmetry with a tolerance relative to the largest entry.
    #[must_use]
    pub fn is_symmetric(&self, rel_tol: f64) -> bool {
        if !self.is_square() {
            return false;
        }
        let bound = rel_tol * self.max_abs();
        self.max_asymmetry().map_or(true, |(_, _, diff)| diff <= bound)
    }
}

fn check_len(len: usize, rows: usize, cols: usize) -> Result<()> {
    let expected = rows * cols;
    if len != expected {
        return Err(DimensionError::DataLength {
            expected,
            actual: len,
        }
        .into());
    }
    Ok(())
}

// ============================================================
// Trait Implementations
// ============================================================

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix({}x{}, {:?})", self.rows, self.cols, self.data)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for r in 0..self.rows {
            write!(f, "  [")?;
            for c in 0..self.cols {
                if c > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.data[r * self.cols + c])?;
            }
            writeln!(f, "]")?;
        }
        write!(f, "]")
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinalgError;

    #[test]
    fn test_matrix_creation() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 2);
        assert_eq!(m.shape(), (2, 2));
        assert!(m.is_square());
    }

    #[test]
    fn test_matrix_creation_invalid() {
        let err = Matrix::new(vec![1.0, 2.0, 3.0], 2, 2).unwrap_err();
        assert_eq!(
            err,
            LinalgError::Dimension(DimensionError::DataLength {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_from_rows_ragged() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0]]).unwrap_err();
        assert_eq!(
            err,
            LinalgError::Dimension(DimensionError::RaggedRows {
                row: 2,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_from_rows_empty() {
        let m = Matrix::from_rows(vec![]).unwrap();
        assert_eq!(m.shape(), (0, 0));
        assert!(m.is_empty());
    }

    #[test]
    fn test_col_major_round_trip() {
        // R stores matrix(c(1,2,3,4,5,6), nrow = 2) column by column.
        let m = Matrix::from_col_major(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        assert_eq!(m.row(0), Some([1.0, 3.0, 5.0].as_slice()));
        assert_eq!(m.row(1), Some([2.0, 4.0, 6.0].as_slice()));
        assert_eq!(m.to_col_major(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_identity_and_diagonal() {
        let i = Matrix::identity(3);
        assert_eq!(i[(0, 0)], 1.0);
        assert_eq!(i[(0, 1)], 0.0);
        let d = Matrix::diagonal(&[1.0, 2.0]);
        assert_eq!(d.as_slice(), &[1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_row_col_access() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        assert_eq!(m.row(0), Some([1.0, 2.0, 3.0].as_slice()));
        assert_eq!(m.col(1), Some(vec![2.0, 5.0]));
        assert_eq!(m.get(1, 2), Some(6.0));
        assert_eq!(m.get(2, 0), None);
        assert!(m.row(2).is_none());
        assert!(m.col(3).is_none());
    }

    #[test]
    fn test_transpose() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(0, 1)], 4.0);
        assert_eq!(t[(2, 0)], 3.0);
    }

    #[test]
    fn test_select_and_swap_cols() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        let s = m.select_cols(&[2, 0]);
        assert_eq!(s.to_rows(), vec![vec![3.0, 1.0], vec![6.0, 4.0]]);

        let mut w = m.clone();
        w.swap_cols(0, 2);
        assert_eq!(w.row(0), Some([3.0, 2.0, 1.0].as_slice()));
    }

    #[test]
    fn test_scale_cols() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let s = m.scale_cols(&[10.0, -1.0]);
        assert_eq!(s.as_slice(), &[10.0, -2.0, 30.0, -4.0]);
    }

    #[test]
    fn test_symmetry_checks() {
        let sym = Matrix::new(vec![1.0, 2.0, 2.0, 1.0], 2, 2).unwrap();
        assert!(sym.is_symmetric(1e-12));
        assert_eq!(sym.max_asymmetry(), Some((1, 0, 0.0)));

        let asym = Matrix::new(vec![1.0, 2.0, 5.0, 1.0], 2, 2).unwrap();
        assert!(!asym.is_symmetric(1e-12));
        assert_eq!(asym.max_asymmetry(), Some((1, 0, 3.0)));

        let rect = Matrix::zeros(2, 3);
        assert!(!rect.is_symmetric(1e-12));
        assert!(rect.max_asymmetry().is_none());
    }

    #[test]
    fn test_finite_and_norms() {
        let m = Matrix::new(vec![3.0, -4.0], 1, 2).unwrap();
        assert!(m.is_finite());
        assert_eq!(m.max_abs(), 4.0);
        assert!((m.norm() - 5.0).abs() < 1e-12);

        let bad = Matrix::new(vec![1.0, f64::NAN], 1, 2).unwrap();
        assert!(!bad.is_finite());
    }

    #[test]
    fn test_display() {
        let m = Matrix::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        assert_eq!(m.to_string(), "[\n  [1, 2]\n  [3, 4]\n]");
    }
}
