//! Linear algebra on small dense symmetric matrices.
//!
//! Parameter-set covariance matrices are tiny next to the event loop (tens to a few
//! hundred rows), so we favour robust dense routines from nalgebra:
//! - `try_symmetric_eigen` for the eigen-basis machinery (eigenvalues re-sorted
//!   descending, since nalgebra makes no ordering promise)
//! - `try_inverse` for the direct inversion path
//! - Cholesky for correlated throws
//!
//! Every routine validates shape and finiteness up front and reports failures as
//! `Error::Numeric` / `Error::SizeMismatch` instead of panicking inside nalgebra.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::{Error, Result};

/// Relative tolerance used for symmetry checks.
const SYMMETRY_RTOL: f64 = 1e-9;

/// Eigen-decomposition with eigenvalues sorted in descending order.
///
/// Column `i` of `vectors` is the unit eigenvector for `values[i]`.
#[derive(Debug, Clone)]
pub struct SortedEigen {
    pub values: DVector<f64>,
    pub vectors: DMatrix<f64>,
}

/// Build a square matrix from row vectors.
pub fn matrix_from_rows(what: &str, rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let n = rows.len();
    if n == 0 {
        return Err(Error::config(format!("{what} is empty")));
    }
    for row in rows {
        if row.len() != n {
            return Err(Error::size_mismatch(format!("{what} row"), n, row.len()));
        }
    }
    let m = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
    ensure_finite(what, &m)?;
    Ok(m)
}

pub fn ensure_finite(what: &str, m: &DMatrix<f64>) -> Result<()> {
    if m.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::Numeric(format!("{what} has non-finite entries")))
    }
}

/// Check that `m` is square and symmetric within a relative tolerance.
pub fn ensure_symmetric(what: &str, m: &DMatrix<f64>) -> Result<()> {
    if !m.is_square() {
        return Err(Error::size_mismatch(format!("{what} columns"), m.nrows(), m.ncols()));
    }
    let scale = m.amax().max(f64::MIN_POSITIVE);
    for i in 0..m.nrows() {
        for j in (i + 1)..m.ncols() {
            if (m[(i, j)] - m[(j, i)]).abs() > SYMMETRY_RTOL * scale {
                return Err(Error::Numeric(format!(
                    "{what} is not symmetric at ({i}, {j}): {} vs {}",
                    m[(i, j)],
                    m[(j, i)]
                )));
            }
        }
    }
    Ok(())
}

/// Direct inverse of a square matrix.
pub fn invert(what: &str, m: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let inv = m
        .clone()
        .try_inverse()
        .ok_or_else(|| Error::Numeric(format!("{what} is singular")))?;
    if inv.iter().all(|v| v.is_finite()) {
        Ok(inv)
    } else {
        Err(Error::Numeric(format!("{what} inverse is not finite")))
    }
}

/// Symmetric eigen-decomposition with eigenvalues sorted high to low.
///
/// Eigenvector signs are normalised so that the largest-magnitude component of
/// each column is positive. This keeps eigen-basis coordinates reproducible
/// across platforms and nalgebra versions.
pub fn symmetric_eigen_descending(what: &str, m: &DMatrix<f64>) -> Result<SortedEigen> {
    ensure_finite(what, m)?;
    ensure_symmetric(what, m)?;

    let eig = m
        .clone()
        .try_symmetric_eigen(f64::EPSILON, 0)
        .ok_or_else(|| Error::Numeric(format!("{what} eigen decomposition did not converge")))?;

    let n = eig.eigenvalues.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let values = DVector::from_iterator(n, order.iter().map(|&k| eig.eigenvalues[k]));
    let mut vectors = DMatrix::zeros(n, n);
    for (dst, &src) in order.iter().enumerate() {
        let mut col = eig.eigenvectors.column(src).into_owned();
        let pivot = col.iamax();
        if col[pivot] < 0.0 {
            col.neg_mut();
        }
        vectors.set_column(dst, &col);
    }

    Ok(SortedEigen { values, vectors })
}

/// `V · diag(d) · Vᵀ`.
pub fn reconstruct(vectors: &DMatrix<f64>, diag: &DVector<f64>) -> DMatrix<f64> {
    let mut scaled = vectors.clone();
    for (j, mut col) in scaled.column_iter_mut().enumerate() {
        col *= diag[j];
    }
    scaled * vectors.transpose()
}

/// Lower-triangular Cholesky factor, or `None` when `m` is not positive definite.
pub fn cholesky_lower(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    Cholesky::new(m.clone()).map(|c| c.l())
}

/// Correlation matrix `C_ij / sqrt(C_ii C_jj)`; zero-variance rows map to zero.
pub fn correlation_from_covariance(cov: &DMatrix<f64>) -> DMatrix<f64> {
    let n = cov.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        let denom = (cov[(i, i)] * cov[(j, j)]).sqrt();
        if denom > 0.0 { cov[(i, j)] / denom } else { 0.0 }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eigenvalues_come_out_descending() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 2.0]);
        let eig = symmetric_eigen_descending("cov", &m).unwrap();
        let values: Vec<f64> = eig.values.iter().copied().collect();
        assert!((values[0] - 4.0).abs() < 1e-12);
        assert!((values[1] - 2.0).abs() < 1e-12);
        assert!((values[2] - 1.0).abs() < 1e-12);
        // The dominant mode is the second axis, sign normalised to +.
        assert!((eig.vectors[(1, 0)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reconstruct_recovers_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let eig = symmetric_eigen_descending("cov", &m).unwrap();
        let back = reconstruct(&eig.vectors, &eig.values);
        assert!((back - m).amax() < 1e-12);
    }

    #[test]
    fn singular_matrix_is_a_numeric_error() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(matches!(invert("cov", &m), Err(Error::Numeric(_))));
    }

    #[test]
    fn ragged_rows_are_a_size_mismatch() {
        let rows = vec![vec![1.0, 0.0], vec![0.0]];
        assert!(matches!(
            matrix_from_rows("cov", &rows),
            Err(Error::SizeMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn asymmetric_matrix_is_rejected() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.2, 0.3, 1.0]);
        assert!(matches!(ensure_symmetric("cov", &m), Err(Error::Numeric(_))));
    }
}
