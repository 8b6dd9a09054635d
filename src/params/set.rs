//! A group of correlated parameters and its covariance geometry.
//!
//! A set is configured, then initialized once from a [`CovarianceSource`]. Initialization
//! builds the parameters (std-dev = sqrt of the diagonal, value = prior), applies limits
//! and per-parameter definitions, and inverts the covariance either directly or through
//! an [`EigenDecomposition`]. After that every matrix is read-only; only parameter values
//! change.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::domain::{Bounds, CovarianceEntry, ParameterDefinition, ParameterSetConfig, Validity, pair_to_bounds};
use crate::error::{Error, Result};
use crate::io::CovarianceSource;
use crate::math::{correlation_from_covariance, ensure_symmetric, invert, matrix_from_rows};
use crate::params::{EigenDecomposition, Parameter};

/// Matrices fixed at initialization.
#[derive(Debug, Clone)]
struct Geometry {
    covariance: DMatrix<f64>,
    correlation: DMatrix<f64>,
    inverse_covariance: DMatrix<f64>,
    eigen: Option<EigenDecomposition>,
}

#[derive(Debug)]
pub struct ParameterSet {
    config: ParameterSetConfig,
    initialized: bool,
    parameters: Vec<Arc<Parameter>>,
    eigen_parameters: Vec<Arc<Parameter>>,
    geometry: Option<Geometry>,
}

impl ParameterSet {
    pub fn new(config: ParameterSetConfig) -> Self {
        Self {
            config,
            initialized: false,
            parameters: Vec::new(),
            eigen_parameters: Vec::new(),
            geometry: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ParameterSetConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn uses_eigen_decomposition(&self) -> bool {
        self.config.uses_eigen_decomposition()
    }

    pub fn throw_before_fit(&self) -> bool {
        self.config.enable_throw_mc_before_fit
    }

    /// Build parameters and matrices. A disabled set initializes with no parameters.
    pub fn initialize(&mut self, source: &dyn CovarianceSource) -> Result<()> {
        self.config.validate()?;
        self.initialized = false;
        self.parameters.clear();
        self.eigen_parameters.clear();
        self.geometry = None;

        tracing::info!(set = %self.name(), "initializing parameter set");
        if !self.config.is_enabled {
            tracing::warn!(set = %self.name(), "parameter set is disabled");
            self.initialized = true;
            return Ok(());
        }

        let entry = source.covariance_entry(self.name())?;
        let covariance = matrix_from_rows(&format!("{} covariance", self.name()), &entry.matrix)?;
        ensure_symmetric(&format!("{} covariance", self.name()), &covariance)?;

        self.parameters = self.build_parameters(entry, &covariance)?;
        let geometry = self.build_geometry(covariance)?;

        if let Some(eigen) = &geometry.eigen {
            self.eigen_parameters = self.build_eigen_parameters(eigen)?;
        }
        self.geometry = Some(geometry);
        self.initialized = true;

        tracing::info!(
            set = %self.name(),
            parameters = self.parameters.len(),
            enabled = self.parameters.iter().filter(|p| p.is_enabled()).count(),
            "parameter set initialized"
        );
        Ok(())
    }

    fn build_parameters(&self, entry: &CovarianceEntry, covariance: &DMatrix<f64>) -> Result<Vec<Arc<Parameter>>> {
        let name = self.name();
        let n = covariance.nrows();

        let priors = match &entry.priors {
            Some(priors) => check_len(name, "priors", priors.clone(), n)?,
            None => vec![1.0; n],
        };
        let names = match &entry.names {
            Some(names) => check_len(name, "names", names.clone(), n)?,
            None => vec![String::new(); n],
        };
        let lower = match &entry.lower_bounds {
            Some(v) => check_len(name, "lowerBounds", v.clone(), n)?,
            None => vec![None; n],
        };
        let upper = match &entry.upper_bounds {
            Some(v) => check_len(name, "upperBounds", v.clone(), n)?,
            None => vec![None; n],
        };
        let global = match self.config.parameter_limits {
            Some(limits) => limits.to_bounds()?,
            None => Bounds::UNBOUNDED,
        };

        for def in &self.config.parameter_definitions {
            if def.parameter_name.is_none() && def.parameter_index.is_none() {
                return Err(Error::config(format!(
                    "{name}: parameter definition needs 'parameterName' or 'parameterIndex'"
                )));
            }
            if let Some(index) = def.parameter_index {
                if index >= n {
                    return Err(Error::config(format!(
                        "{name}: parameterIndex {index} is out of range for {n} parameters"
                    )));
                }
            }
        }

        let mut parameters = Vec::with_capacity(n);
        for i in 0..n {
            let variance = covariance[(i, i)];
            if variance < 0.0 {
                return Err(Error::Numeric(format!("{name}: negative variance {variance} at #{i}")));
            }
            let domain = global.overridden_by(Bounds::new(lower[i], upper[i])?)?;
            let mut parameter = Parameter::new(name, i, names[i].clone(), priors[i], variance.sqrt()).with_domain(domain);

            if let Some(def) = self.find_definition(i, &names[i]) {
                parameter = apply_definition(parameter, def)?;
            }

            parameter.validate()?;
            if parameter.is_enabled() && !parameter.is_in_domain(parameter.prior()) {
                return Err(Error::config(format!(
                    "{}: prior {} is outside domain {}",
                    parameter.full_title(),
                    parameter.prior(),
                    parameter.domain().describe()
                )));
            }
            parameters.push(Arc::new(parameter));
        }

        for def in &self.config.parameter_definitions {
            if let Some(wanted) = &def.parameter_name {
                if def.parameter_index.is_none() && !names.iter().any(|n| n == wanted) {
                    tracing::warn!(set = %name, parameter = %wanted, "definition matches no parameter");
                }
            }
        }
        Ok(parameters)
    }

    /// Definition for parameter `index`: by name first, then by index.
    fn find_definition(&self, index: usize, name: &str) -> Option<&ParameterDefinition> {
        let defs = &self.config.parameter_definitions;
        defs.iter()
            .find(|d| !name.is_empty() && d.parameter_name.as_deref() == Some(name))
            .or_else(|| defs.iter().find(|d| d.parameter_index == Some(index)))
    }

    fn build_geometry(&self, covariance: DMatrix<f64>) -> Result<Geometry> {
        let what = format!("{} covariance", self.name());
        let correlation = correlation_from_covariance(&covariance);

        if !self.uses_eigen_decomposition() {
            tracing::debug!(set = %self.name(), "inverting covariance directly");
            let inverse_covariance = invert(&what, &covariance)?;
            return Ok(Geometry {
                covariance,
                correlation,
                inverse_covariance,
                eigen: None,
            });
        }

        let eigen = EigenDecomposition::compute(&what, &covariance, self.config.max_eigen_fraction)?;
        tracing::info!(
            set = %self.name(),
            retained = eigen.nb_retained(),
            modes = eigen.len(),
            fraction = eigen.retained_fraction(),
            "eigen decomposition of the covariance"
        );
        Ok(Geometry {
            covariance,
            correlation,
            inverse_covariance: eigen.inverse_covariance().clone(),
            eigen: Some(eigen),
        })
    }

    fn build_eigen_parameters(&self, eigen: &EigenDecomposition) -> Result<Vec<Arc<Parameter>>> {
        let owner = format!("{} (eigen)", self.name());
        let priors = eigen.to_eigen_basis(&self.prior_vector())?;
        let parameters = (0..eigen.len())
            .map(|mode| {
                let lambda = eigen.values()[mode].max(0.0);
                Arc::new(
                    Parameter::new(owner.clone(), mode, "", priors[mode], lambda.sqrt())
                        .with_validity(Validity::NONE)
                        .with_enabled(eigen.is_retained(mode)),
                )
            })
            .collect();
        Ok(parameters)
    }

    pub fn nb_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.parameters
    }

    pub fn parameter(&self, index: usize) -> Option<&Arc<Parameter>> {
        self.parameters.get(index)
    }

    pub fn parameter_by_name(&self, name: &str) -> Option<&Arc<Parameter>> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    /// Match a name, a `#<index>` title or a full `#<index>_<name>` title.
    pub fn find_parameter(&self, key: &str) -> Option<&Arc<Parameter>> {
        self.parameter_by_name(key)
            .or_else(|| self.parameters.iter().find(|p| p.title() == key))
            .or_else(|| {
                let index = key.strip_prefix('#')?.parse::<usize>().ok()?;
                self.parameter(index)
            })
    }

    /// Eigen-basis parameters (empty without eigen decomposition).
    pub fn eigen_parameters(&self) -> &[Arc<Parameter>] {
        &self.eigen_parameters
    }

    fn geometry(&self, what: &'static str) -> Result<&Geometry> {
        if !self.initialized {
            return Err(Error::Uninitialized {
                owner: self.name().to_string(),
                what,
            });
        }
        self.geometry
            .as_ref()
            .ok_or_else(|| Error::SetDisabled(self.name().to_string()))
    }

    pub fn covariance(&self) -> Result<&DMatrix<f64>> {
        Ok(&self.geometry("covariance")?.covariance)
    }

    pub fn correlation(&self) -> Result<&DMatrix<f64>> {
        Ok(&self.geometry("correlation")?.correlation)
    }

    /// Direct inverse, or the pruned eigen inverse.
    pub fn inverse_covariance(&self) -> Result<&DMatrix<f64>> {
        Ok(&self.geometry("inverse covariance")?.inverse_covariance)
    }

    pub fn eigen(&self) -> Result<&EigenDecomposition> {
        self.geometry("eigen decomposition")?
            .eigen
            .as_ref()
            .ok_or_else(|| Error::EigenDisabled(self.name().to_string()))
    }

    /// Retained eigen modes, or the parameter count when eigen decomposition is off.
    /// A disabled set has none.
    pub fn nb_enabled_eigen_modes(&self) -> Result<usize> {
        if self.initialized && !self.config.is_enabled {
            return Ok(0);
        }
        let geometry = self.geometry("eigen mode count")?;
        Ok(match &geometry.eigen {
            Some(eigen) => eigen.nb_retained(),
            None => geometry.covariance.nrows(),
        })
    }

    pub fn to_eigen_basis(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        self.eigen()?.to_eigen_basis(x)
    }

    pub fn to_original_basis(&self, y: &DVector<f64>) -> Result<DVector<f64>> {
        self.eigen()?.to_original_basis(y)
    }

    /// Gaussian penalty `Δᵀ·C⁻¹·Δ` over enabled parameters.
    pub fn chi2(&self) -> Result<f64> {
        if !self.config.is_enabled {
            return Ok(0.0);
        }
        let inverse = self.inverse_covariance()?;

        let deltas: Vec<Option<f64>> = self
            .parameters
            .iter()
            .map(|p| p.is_enabled().then(|| p.value() - p.prior()))
            .collect();

        let mut chi2 = 0.0;
        for (i, di) in deltas.iter().enumerate() {
            let Some(di) = di else { continue };
            for (j, dj) in deltas.iter().enumerate() {
                let Some(dj) = dj else { continue };
                chi2 += di * inverse[(i, j)] * dj;
            }
        }
        Ok(chi2)
    }

    pub fn prior_vector(&self) -> DVector<f64> {
        DVector::from_iterator(self.parameters.len(), self.parameters.iter().map(|p| p.prior()))
    }

    pub fn value_vector(&self) -> DVector<f64> {
        DVector::from_iterator(self.parameters.len(), self.parameters.iter().map(|p| p.value()))
    }

    /// Write current original-basis values into the eigen parameters.
    pub fn propagate_original_to_eigen(&self) -> Result<()> {
        let y = self.to_eigen_basis(&self.value_vector())?;
        for (p, v) in self.eigen_parameters.iter().zip(y.iter()) {
            p.set_value(*v)?;
        }
        Ok(())
    }

    /// Write eigen-parameter values back into the original basis.
    ///
    /// Deviations from the eigen priors are transformed; excluded modes contribute
    /// nothing. Disabled original parameters are left untouched.
    pub fn propagate_eigen_to_original(&self, force: bool) -> Result<()> {
        let eigen = self.eigen()?;
        let dy = DVector::from_iterator(
            self.eigen_parameters.len(),
            self.eigen_parameters.iter().map(|p| p.value() - p.prior()),
        );
        let dx = eigen.to_original_basis(&dy)?;
        for (p, d) in self.parameters.iter().zip(dx.iter()) {
            if p.is_enabled() {
                p.set_value_with(p.prior() + d, force)?;
            }
        }
        Ok(())
    }

    pub fn move_to_prior(&self) {
        for p in self.parameters.iter().chain(self.eigen_parameters.iter()) {
            p.set_value_at_prior();
        }
    }

    pub fn summary(&self) -> String {
        let mut out = format!("{}: {} parameters", self.name(), self.parameters.len());
        if !self.config.is_enabled {
            out.push_str(" (disabled)");
        }
        if let Some(eigen) = self.geometry.as_ref().and_then(|g| g.eigen.as_ref()) {
            out.push_str(&format!(
                ", eigen modes {}/{} (fraction {:.4})",
                eigen.nb_retained(),
                eigen.len(),
                eigen.retained_fraction()
            ));
        }
        for p in &self.parameters {
            out.push_str("\n  ");
            out.push_str(&p.summary());
        }
        out
    }
}

fn check_len<T>(set: &str, what: &str, v: Vec<T>, n: usize) -> Result<Vec<T>> {
    if v.len() == n {
        Ok(v)
    } else {
        Err(Error::size_mismatch(format!("{set} {what}"), n, v.len()))
    }
}

fn apply_definition(mut parameter: Parameter, def: &ParameterDefinition) -> Result<Parameter> {
    if let Some(prior) = def.prior_value {
        parameter = parameter.with_prior(prior);
    }
    if let Some(pair) = def.parameter_limits {
        let limits = pair_to_bounds(pair)?;
        tracing::debug!(parameter = %parameter.full_title(), limits = %limits.describe(), "parameter limits override");
        let domain = parameter.domain().overridden_by(limits)?;
        parameter = parameter.with_domain(domain);
    }
    if let Some(pair) = def.mirror_limits {
        parameter = parameter.with_mirror(pair_to_bounds(pair)?);
    }
    if let Some(limits) = def.physical_limits {
        parameter = parameter.with_physical(limits.to_bounds()?);
    }
    if let Some(prior_type) = def.prior_type {
        parameter = parameter.with_prior_type(prior_type);
    }
    if let Some(step) = def.parameter_step_size {
        parameter = parameter.with_step_size(step);
    }
    if let Some(tokens) = &def.validity {
        let validity = parameter.validity().parse_onto(tokens);
        parameter = parameter.with_validity(validity);
    }
    Ok(parameter.with_enabled(def.is_enabled).with_fixed(def.is_fixed))
}
