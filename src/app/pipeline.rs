//! Shared model workflow used by every subcommand.
//!
//! config JSON -> covariance store -> initialized parameter sets -> dial collections
//!
//! The subcommand handlers then only decide what to print.

use std::path::Path;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::dial::{DialCollection, DialInterface, ResponseRegistry};
use crate::domain::ModelConfig;
use crate::error::{Error, Result};
use crate::io::{CovarianceStore, read_model_config};
use crate::params::{Parameter, ParametersManager};

/// A fully initialized model.
#[derive(Debug)]
pub struct Model {
    pub config: ModelConfig,
    pub parameters: ParametersManager,
    /// One collection per parameter set, in configuration order.
    pub dials: Vec<DialCollection>,
}

impl Model {
    /// Initialize parameters and dials from an in-memory configuration.
    pub fn build(config: ModelConfig, store: &CovarianceStore, registry: &ResponseRegistry) -> Result<Self> {
        let mut parameters = ParametersManager::new(config.parameter_sets.iter().cloned())?;
        parameters.initialize(store)?;
        let dials = parameters
            .sets()
            .iter()
            .map(|set| DialCollection::from_definitions(set, registry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            config,
            parameters,
            dials,
        })
    }

    /// Interfaces bound to `parameter`, across every collection.
    pub fn dials_for<'a>(&'a self, parameter: &'a Arc<Parameter>) -> Vec<&'a DialInterface> {
        self.dials.iter().flat_map(|c| c.for_parameter(parameter)).collect()
    }

    pub fn reset_dials(&self) {
        for collection in &self.dials {
            collection.reset_all();
        }
    }
}

/// Read a configuration file and initialize the model it describes.
pub fn load_model(path: &Path, registry: &ResponseRegistry) -> Result<Model> {
    let config = read_model_config(path)?;
    let store = CovarianceStore::from_config(&config)?;
    Model::build(config, &store, registry)
}

/// Per-set penalty terms and their total.
#[derive(Debug, Clone, PartialEq)]
pub struct Chi2Report {
    pub per_set: Vec<(String, f64)>,
    pub total: f64,
}

/// Apply `<set>/<parameter> = value` assignments, then evaluate every set's chi-square.
pub fn evaluate_chi2(model: &Model, assignments: &[(String, f64)], force: bool) -> Result<Chi2Report> {
    for (path, value) in assignments {
        model.parameters.find_parameter(path)?.set_value_with(*value, force)?;
    }
    let per_set = model
        .parameters
        .sets()
        .iter()
        .map(|set| Ok((set.name().to_string(), set.chi2()?)))
        .collect::<Result<Vec<_>>>()?;
    let total = per_set.iter().map(|(_, c)| c).sum();
    Ok(Chi2Report { per_set, total })
}

/// Responses of every dial bound to one parameter over a value grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    pub parameter: String,
    /// Response type of each dial, with its applicability bin when it has one.
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// `responses[i][k]`: dial `k` at `values[i]`.
    pub responses: Vec<Vec<f64>>,
}

/// Scan range: explicit ends win, then domain limits, then prior ± 3σ.
pub fn scan_range(parameter: &Parameter, min: Option<f64>, max: Option<f64>) -> Result<(f64, f64)> {
    let domain = parameter.domain();
    let lo = min.or(domain.min).unwrap_or(parameter.prior() - 3.0 * parameter.std_dev());
    let hi = max.or(domain.max).unwrap_or(parameter.prior() + 3.0 * parameter.std_dev());
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return Err(Error::config(format!(
            "invalid scan range [{lo}, {hi}] for {}",
            parameter.full_title()
        )));
    }
    Ok((lo, hi))
}

pub fn scan_parameter(model: &Model, path: &str, min: Option<f64>, max: Option<f64>, steps: usize) -> Result<Scan> {
    let parameter = model.parameters.find_parameter(path)?;
    let dials = model.dials_for(parameter);
    if dials.is_empty() {
        return Err(Error::config(format!("no dial is bound to {}", parameter.full_title())));
    }
    if steps < 2 {
        return Err(Error::config("a scan needs at least 2 steps"));
    }
    let (lo, hi) = scan_range(parameter, min, max)?;
    let values: Vec<f64> = (0..steps)
        .map(|i| lo + (hi - lo) * i as f64 / (steps - 1) as f64)
        .collect();

    let labels = dials
        .iter()
        .map(|iface| {
            let dial = iface.dial();
            match iface.bin() {
                Some(bin) => format!("{}:b{{{}}}", dial.function().type_name(), bin.summary()),
                None => dial.function().type_name().to_string(),
            }
        })
        .collect();

    let responses: Vec<Vec<f64>> = values
        .par_iter()
        .map(|&v| dials.iter().map(|iface| iface.dial().evaluate_at(v)).collect::<Vec<f64>>())
        .collect();
    model.reset_dials();

    tracing::info!(parameter = %parameter.full_title(), dials = dials.len(), steps, "scan done");
    Ok(Scan {
        parameter: parameter.full_title(),
        labels,
        values,
        responses,
    })
}

/// Chi-square statistics of one set over the toys.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStats {
    pub set: String,
    pub mean: f64,
    pub rms: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowReport {
    pub toys: usize,
    pub seed: u64,
    pub attempts: usize,
    pub per_set: Vec<ThrowStats>,
}

/// Throw `toys` correlated toys from a seeded RNG and collect chi-square statistics.
///
/// Parameters are moved back to their priors afterwards.
pub fn run_throws(model: &Model, toys: usize, seed: u64, n_sigma: f64, all: bool) -> Result<ThrowReport> {
    let mut rng = StdRng::seed_from_u64(seed);
    let sets = model.parameters.sets();
    let mut samples: Vec<Vec<f64>> = vec![Vec::with_capacity(toys); sets.len()];
    let mut attempts = 0;

    for _ in 0..toys {
        for (set, chi2s) in sets.iter().zip(samples.iter_mut()) {
            if all || set.throw_before_fit() {
                attempts += set.throw_parameters(&mut rng, n_sigma)?;
            }
            chi2s.push(set.chi2()?);
        }
    }
    model.parameters.move_to_prior();

    let per_set = sets
        .iter()
        .zip(samples)
        .map(|(set, chi2s)| {
            let n = chi2s.len().max(1) as f64;
            let mean = chi2s.iter().sum::<f64>() / n;
            let rms = (chi2s.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n).sqrt();
            let max = chi2s.iter().copied().fold(0.0, f64::max);
            ThrowStats {
                set: set.name().to_string(),
                mean,
                rms,
                max,
            }
        })
        .collect();

    Ok(ThrowReport {
        toys,
        seed,
        attempts,
        per_set,
    })
}
