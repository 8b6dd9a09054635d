//! Eigen-basis regularization of a covariance matrix.
//!
//! Modes are ranked by eigenvalue (descending). With `max_fraction < 1` the leading modes
//! are kept while their cumulative share of the trace stays within `max_fraction`; the mode
//! that crosses the threshold and every mode after it are excluded. The dominant mode is
//! always kept so that the regularized covariance never collapses to zero.
//!
//! Excluded modes carry zero weight in every derived matrix:
//! - projector `P = V·diag(state)·Vᵀ`
//! - inverse covariance `V·diag(1/λ retained)·Vᵀ`
//! - effective covariance `V·diag(λ retained)·Vᵀ`

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::math::{reconstruct, symmetric_eigen_descending};

#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    values: DVector<f64>,
    inverse_values: DVector<f64>,
    vectors: DMatrix<f64>,
    vectors_t: DMatrix<f64>,
    retained: Vec<bool>,
    nb_retained: usize,
    max_fraction: f64,
    retained_fraction: f64,
    projector: DMatrix<f64>,
    inverse_covariance: DMatrix<f64>,
    effective_covariance: DMatrix<f64>,
}

impl EigenDecomposition {
    /// Decompose `covariance`, keeping at most `max_fraction` of its trace.
    pub fn compute(what: &str, covariance: &DMatrix<f64>, max_fraction: f64) -> Result<Self> {
        if !(max_fraction > 0.0 && max_fraction <= 1.0) {
            return Err(Error::config(format!(
                "{what}: eigen fraction must be in (0, 1], got {max_fraction}"
            )));
        }
        let eig = symmetric_eigen_descending(what, covariance)?;
        let n = eig.values.len();

        let total: f64 = eig.values.iter().sum();
        if !(total > 0.0) {
            return Err(Error::Numeric(format!("{what} has a non-positive trace ({total})")));
        }

        let prune = max_fraction < 1.0;
        let mut retained = vec![false; n];
        let mut cumulative = 0.0;
        for (i, &lambda) in eig.values.iter().enumerate() {
            cumulative += lambda;
            if prune && i > 0 && cumulative / total > max_fraction {
                cumulative -= lambda;
                tracing::debug!(mode = i, fraction = cumulative / total, "eigen pruning stops");
                break;
            }
            retained[i] = true;
        }

        let tolerance = eig.values[0].abs() * n as f64 * f64::EPSILON;
        for (i, &lambda) in eig.values.iter().enumerate() {
            if retained[i] && lambda <= tolerance {
                return Err(Error::Numeric(format!(
                    "{what}: retained eigenvalue #{i} is not positive ({lambda:e})"
                )));
            }
        }

        let state = DVector::from_iterator(n, retained.iter().map(|&r| if r { 1.0 } else { 0.0 }));
        let inverse_values = DVector::from_fn(n, |i, _| if retained[i] { 1.0 / eig.values[i] } else { 0.0 });
        let kept_values = DVector::from_fn(n, |i, _| if retained[i] { eig.values[i] } else { 0.0 });

        let projector = reconstruct(&eig.vectors, &state);
        let inverse_covariance = reconstruct(&eig.vectors, &inverse_values);
        let effective_covariance = reconstruct(&eig.vectors, &kept_values);
        let nb_retained = retained.iter().filter(|&&r| r).count();
        let retained_fraction = kept_values.iter().sum::<f64>() / total;

        Ok(Self {
            vectors_t: eig.vectors.transpose(),
            values: eig.values,
            inverse_values,
            vectors: eig.vectors,
            retained,
            nb_retained,
            max_fraction,
            retained_fraction,
            projector,
            inverse_covariance,
            effective_covariance,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Eigenvalues, highest first.
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// `1/λ` for retained modes, zero otherwise.
    pub fn inverse_values(&self) -> &DVector<f64> {
        &self.inverse_values
    }

    /// Eigenvectors as columns, ordered like [`Self::values`].
    pub fn vectors(&self) -> &DMatrix<f64> {
        &self.vectors
    }

    pub fn is_retained(&self, mode: usize) -> bool {
        self.retained.get(mode).copied().unwrap_or(false)
    }

    pub fn nb_retained(&self) -> usize {
        self.nb_retained
    }

    pub fn max_fraction(&self) -> f64 {
        self.max_fraction
    }

    /// Share of the trace carried by the retained modes.
    pub fn retained_fraction(&self) -> f64 {
        self.retained_fraction
    }

    pub fn projector(&self) -> &DMatrix<f64> {
        &self.projector
    }

    pub fn inverse_covariance(&self) -> &DMatrix<f64> {
        &self.inverse_covariance
    }

    pub fn effective_covariance(&self) -> &DMatrix<f64> {
        &self.effective_covariance
    }

    /// `Vᵀ·x`.
    pub fn to_eigen_basis(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        self.check_len("original-basis vector", x)?;
        Ok(&self.vectors_t * x)
    }

    /// `V·diag(state)·y`: excluded modes do not contribute.
    pub fn to_original_basis(&self, y: &DVector<f64>) -> Result<DVector<f64>> {
        self.check_len("eigen-basis vector", y)?;
        let masked = DVector::from_fn(y.len(), |i, _| if self.retained[i] { y[i] } else { 0.0 });
        Ok(&self.vectors * masked)
    }

    fn check_len(&self, what: &str, v: &DVector<f64>) -> Result<()> {
        if v.len() == self.len() {
            Ok(())
        } else {
            Err(Error::size_mismatch(what, self.len(), v.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn correlated() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[2.0, 0.6, 0.1, 0.6, 1.0, 0.3, 0.1, 0.3, 0.5])
    }

    #[test]
    fn round_trip_is_exact_without_pruning() {
        let eig = EigenDecomposition::compute("cov", &correlated(), 1.0).unwrap();
        assert_eq!(eig.nb_retained(), 3);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let x = DVector::from_fn(3, |_, _| rng.gen_range(-5.0..5.0));
            let back = eig.to_original_basis(&eig.to_eigen_basis(&x).unwrap()).unwrap();
            for i in 0..3 {
                assert!((back[i] - x[i]).abs() <= 1e-9 * x[i].abs().max(1.0));
            }
        }
    }

    #[test]
    fn inverse_matches_direct_inverse_without_pruning() {
        let cov = correlated();
        let eig = EigenDecomposition::compute("cov", &cov, 1.0).unwrap();
        let identity = &cov * eig.inverse_covariance();
        assert!((identity - DMatrix::identity(3, 3)).amax() < 1e-10);
        assert!((eig.effective_covariance() - &cov).amax() < 1e-12);
        assert!((eig.projector() - DMatrix::identity(3, 3)).amax() < 1e-12);
    }

    #[test]
    fn dominant_mode_survives_a_tight_fraction() {
        let cov = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 4.0, 1.0]));
        let eig = EigenDecomposition::compute("cov", &cov, 0.5).unwrap();
        assert_eq!(eig.nb_retained(), 1);
        assert!(eig.is_retained(0));
        assert!(!eig.is_retained(1) && !eig.is_retained(2));
        assert!((eig.retained_fraction() - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn pruned_modes_are_zero_everywhere() {
        let cov = DMatrix::from_diagonal(&DVector::from_vec(vec![5.0, 3.0, 2.0]));
        // 5/10 kept, 8/10 crosses 0.7: only the first mode stays.
        let eig = EigenDecomposition::compute("cov", &cov, 0.7).unwrap();
        assert_eq!(eig.nb_retained(), 1);
        assert_eq!(eig.inverse_values()[1], 0.0);
        assert_eq!(eig.inverse_values()[2], 0.0);
        let expected_inv = DMatrix::from_diagonal(&DVector::from_vec(vec![0.2, 0.0, 0.0]));
        assert!((eig.inverse_covariance() - expected_inv).amax() < 1e-12);
        let expected_eff = DMatrix::from_diagonal(&DVector::from_vec(vec![5.0, 0.0, 0.0]));
        assert!((eig.effective_covariance() - expected_eff).amax() < 1e-12);
    }

    #[test]
    fn pruned_round_trip_projects() {
        let cov = DMatrix::from_diagonal(&DVector::from_vec(vec![5.0, 3.0, 2.0]));
        let eig = EigenDecomposition::compute("cov", &cov, 0.7).unwrap();
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let back = eig.to_original_basis(&eig.to_eigen_basis(&x).unwrap()).unwrap();
        let projected = eig.projector() * &x;
        assert!((back - projected).amax() < 1e-12);
    }

    #[test]
    fn transforms_check_vector_length() {
        let eig = EigenDecomposition::compute("cov", &correlated(), 1.0).unwrap();
        let short = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            eig.to_eigen_basis(&short),
            Err(Error::SizeMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn singular_matrix_without_pruning_is_numeric() {
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(matches!(EigenDecomposition::compute("cov", &cov, 1.0), Err(Error::Numeric(_))));
        // The null mode can be pruned away.
        let eig = EigenDecomposition::compute("cov", &cov, 0.9).unwrap();
        assert_eq!(eig.nb_retained(), 1);
    }
}
