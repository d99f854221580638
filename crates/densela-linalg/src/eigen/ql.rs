//! Implicit-shift QL iteration on a symmetric tridiagonal matrix.
//!
//! Each sweep chases a Wilkinson-shifted bulge up the unreduced block with
//! Givens rotations. Rotations are applied to the columns of an optional
//! accumulator so that callers starting from `Q` end with `Q Z`.

use crate::error::{NumericError, Result};
use crate::matrix::Matrix;

/// Diagonalise the tridiagonal `(diag, off)` in place.
///
/// On return `diag` holds the eigenvalues in no particular order. When
/// `vectors` is given its columns are rotated alongside; pass the identity
/// to get the tridiagonal eigenvectors.
pub(crate) fn implicit_ql(
    diag: &mut [f64],
    off: &[f64],
    mut vectors: Option<&mut Matrix>,
    max_iterations: usize,
) -> Result<()> {
    let n = diag.len();
    if n == 0 {
        return Ok(());
    }
    debug_assert_eq!(off.len(), n - 1);

    let d = diag;
    let mut e = vec![0.0; n];
    e[..n - 1].copy_from_slice(off);

    let mut f = 0.0;
    let mut tst1 = 0.0f64;

    for l in 0..n {
        tst1 = tst1.max(d[l].abs() + e[l].abs());

        // Find a negligible subdiagonal element. e[n - 1] is zero, so this stops.
        let mut m = l;
        while m < n - 1 && e[m].abs() > f64::EPSILON * tst1 {
            m += 1;
        }

        if m > l {
            let mut iter = 0;
            loop {
                if iter == max_iterations {
                    return Err(NumericError::NoConvergence {
                        index: l,
                        iterations: iter,
                    }
                    .into());
                }
                iter += 1;

                // Shift
                let mut g = d[l];
                let mut p = (d[l + 1] - g) / (2.0 * e[l]);
                let mut r = p.hypot(1.0);
                if p < 0.0 {
                    r = -r;
                }
                d[l] = e[l] / (p + r);
                d[l + 1] = e[l] * (p + r);
                let dl1 = d[l + 1];
                let mut h = g - d[l];
                for di in d.iter_mut().skip(l + 2) {
                    *di -= h;
                }
                f += h;

                // Implicit QL transformation
                p = d[m];
                let mut c = 1.0;
                let mut c2 = c;
                let mut c3 = c;
                let el1 = e[l + 1];
                let mut s = 0.0;
                let mut s2 = 0.0;
                for i in (l..m).rev() {
                    c3 = c2;
                    c2 = c;
                    s2 = s;
                    g = c * e[i];
                    h = c * p;
                    r = p.hypot(e[i]);
                    e[i + 1] = s * r;
                    s = e[i] / r;
                    c = p / r;
                    p = c * d[i] - s * g;
                    d[i + 1] = h + s * (c * g + s * d[i]);

                    if let Some(v) = vectors.as_deref_mut() {
                        rotate_cols(v, i, c, s);
                    }
                }
                p = -s * s2 * c3 * el1 * e[l] / dl1;
                e[l] = s * p;
                d[l] = c * p;

                if e[l].abs() <= f64::EPSILON * tst1 {
                    break;
                }
            }
        }

        d[l] += f;
        e[l] = 0.0;
    }

    Ok(())
}

/// Apply the plane rotation to columns `i` and `i + 1`.
fn rotate_cols(v: &mut Matrix, i: usize, c: f64, s: f64) {
    let cols = v.cols();
    for row in v.as_mut_slice().chunks_mut(cols) {
        let h = row[i + 1];
        row[i + 1] = s * row[i] + c * h;
        row[i] = c * row[i] - s * h;
    }
}

/// Sort eigenpairs by ascending eigenvalue, permuting columns to match.
pub(crate) fn sort_eigenpairs(values: Vec<f64>, vectors: Matrix) -> (Vec<f64>, Matrix) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let sorted = order.iter().map(|&i| values[i]).collect();
    (sorted, vectors.select_cols(&order))
}
