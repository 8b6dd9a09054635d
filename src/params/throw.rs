//! Correlated Gaussian throws of a parameter set around its prior.
//!
//! A draw is `prior + n_sigma · L·z` with `z ~ N(0, 1)`. `L` is the Cholesky factor of the
//! covariance, or `V·sqrt(Λ)` over the retained modes when the set uses eigen decomposition
//! (so pruned directions are never thrown). Draws that put an enabled, non-fixed parameter
//! outside its validity checks are rejected and redrawn.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};
use crate::math::cholesky_lower;
use crate::params::ParameterSet;

/// Draws attempted before giving up.
pub const MAX_THROW_ATTEMPTS: usize = 1000;

impl ParameterSet {
    /// Factor `L` with `L·Lᵀ` equal to the (effective) covariance.
    pub fn throw_factor(&self) -> Result<DMatrix<f64>> {
        if let Ok(eigen) = self.eigen() {
            let mut factor = eigen.vectors().clone();
            for (j, mut col) in factor.column_iter_mut().enumerate() {
                let scale = if eigen.is_retained(j) { eigen.values()[j].sqrt() } else { 0.0 };
                col *= scale;
            }
            return Ok(factor);
        }
        let covariance = self.covariance()?;
        cholesky_lower(covariance)
            .ok_or_else(|| Error::Numeric(format!("{} covariance is not positive definite", self.name())))
    }

    /// Throw every enabled, non-fixed parameter; returns the number of draws used.
    ///
    /// Disabled sets are left untouched and report zero draws.
    pub fn throw_parameters<R: Rng + ?Sized>(&self, rng: &mut R, n_sigma: f64) -> Result<usize> {
        if !self.is_enabled() {
            return Ok(0);
        }
        let factor = self.throw_factor()?;
        let normal =
            Normal::new(0.0, 1.0).map_err(|e| Error::Numeric(format!("throw distribution error: {e}")))?;
        let prior = self.prior_vector();
        let n = prior.len();

        for attempt in 1..=MAX_THROW_ATTEMPTS {
            let z = DVector::from_fn(n, |_, _| normal.sample(&mut *rng));
            let draw = &prior + (&factor * z) * n_sigma;

            let accepted = self
                .parameters()
                .iter()
                .filter(|p| p.is_enabled() && !p.is_fixed())
                .all(|p| p.is_valid_value(draw[p.index()]));
            if !accepted {
                tracing::debug!(set = %self.name(), attempt, "rejected parameter throw");
                continue;
            }

            for p in self.parameters().iter().filter(|p| p.is_enabled() && !p.is_fixed()) {
                p.set_value(draw[p.index()])?;
            }
            if !self.eigen_parameters().is_empty() {
                self.propagate_original_to_eigen()?;
            }
            tracing::debug!(set = %self.name(), attempts = attempt, "parameters thrown");
            return Ok(attempt);
        }

        Err(Error::Numeric(format!(
            "{}: no valid parameter throw after {MAX_THROW_ATTEMPTS} attempts",
            self.name()
        )))
    }
}
