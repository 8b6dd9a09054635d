//! Configuration model.
//!
//! These types mirror the JSON configuration consumed by `fitdials` (camelCase keys)
//! and are also the programmatic way to describe a model in tests or embedding code.
//! Every type derives `Default` so callers can use struct-update syntax.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{Bounds, DataBin, PriorType};
use crate::error::{Error, Result};

fn default_true() -> bool {
    true
}

fn default_eigen_fraction() -> f64 {
    1.0
}

/// Top-level model description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default)]
    pub parameter_sets: Vec<ParameterSetConfig>,
    /// Optional JSON file holding covariance entries keyed by set name.
    ///
    /// Relative paths are resolved against the configuration file's directory.
    #[serde(default)]
    pub covariance_file_path: Option<PathBuf>,
    /// Inline covariance entries keyed by set name (take precedence over the file).
    #[serde(default)]
    pub covariances: BTreeMap<String, CovarianceEntry>,
}

/// One correlated parameter group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSetConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub use_eigen_decomp_in_fit: bool,
    /// Fraction of the covariance trace kept by eigen pruning. Anything other
    /// than `1` turns eigen decomposition on.
    #[serde(default = "default_eigen_fraction")]
    pub max_eigen_fraction: f64,
    /// Limits applied to every parameter of the set.
    #[serde(default)]
    pub parameter_limits: Option<LimitsConfig>,
    #[serde(default)]
    pub parameter_definitions: Vec<ParameterDefinition>,
    #[serde(default)]
    pub dial_set_definitions: Vec<DialDefinition>,
    #[serde(default)]
    pub enable_throw_mc_before_fit: bool,
}

impl Default for ParameterSetConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_enabled: true,
            use_eigen_decomp_in_fit: false,
            max_eigen_fraction: 1.0,
            parameter_limits: None,
            parameter_definitions: Vec::new(),
            dial_set_definitions: Vec::new(),
            enable_throw_mc_before_fit: false,
        }
    }
}

impl ParameterSetConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn uses_eigen_decomposition(&self) -> bool {
        self.use_eigen_decomp_in_fit || self.max_eigen_fraction != 1.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("parameter set 'name' is missing"));
        }
        if !(self.max_eigen_fraction > 0.0 && self.max_eigen_fraction <= 1.0) {
            return Err(Error::config(format!(
                "{}: maxEigenFraction must be in (0, 1], got {}",
                self.name, self.max_eigen_fraction
            )));
        }
        Ok(())
    }
}

/// `{ "minValue": .., "maxValue": .. }`, either side optional.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsConfig {
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

impl LimitsConfig {
    pub fn to_bounds(self) -> Result<Bounds> {
        Bounds::new(self.min_value, self.max_value)
    }
}

/// `[min, max]` array where `null` leaves a side unset.
pub type LimitPair = [Option<f64>; 2];

pub fn pair_to_bounds(pair: LimitPair) -> Result<Bounds> {
    Bounds::new(pair[0], pair[1])
}

/// Per-parameter overrides, matched by name first and index second.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    #[serde(default)]
    pub parameter_name: Option<String>,
    #[serde(default)]
    pub parameter_index: Option<usize>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub is_fixed: bool,
    #[serde(default)]
    pub prior_type: Option<PriorType>,
    #[serde(default)]
    pub prior_value: Option<f64>,
    #[serde(default)]
    pub parameter_limits: Option<LimitPair>,
    #[serde(default)]
    pub mirror_limits: Option<LimitPair>,
    #[serde(default)]
    pub physical_limits: Option<LimitsConfig>,
    #[serde(default)]
    pub parameter_step_size: Option<f64>,
    /// Validity tokens, e.g. `"range,mirror"` or `"noran,phys"`.
    #[serde(default)]
    pub validity: Option<String>,
}

impl Default for ParameterDefinition {
    fn default() -> Self {
        Self {
            parameter_name: None,
            parameter_index: None,
            is_enabled: true,
            is_fixed: false,
            prior_type: None,
            prior_value: None,
            parameter_limits: None,
            mirror_limits: None,
            physical_limits: None,
            parameter_step_size: None,
            validity: None,
        }
    }
}

/// Covariance matrix and optional per-parameter vectors for one set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CovarianceEntry {
    pub matrix: Vec<Vec<f64>>,
    /// Defaults to `1.0` for every parameter (normalisation parameters).
    #[serde(default)]
    pub priors: Option<Vec<f64>>,
    #[serde(default)]
    pub names: Option<Vec<String>>,
    #[serde(default)]
    pub lower_bounds: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub upper_bounds: Option<Vec<Option<f64>>>,
}

/// Response clamp applied by a supervisor after the dial.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorConfig {
    #[serde(default)]
    pub min_response: Option<f64>,
    #[serde(default)]
    pub max_response: Option<f64>,
}

/// A response function bound to one parameter of the set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialDefinition {
    #[serde(default)]
    pub parameter_name: Option<String>,
    #[serde(default)]
    pub parameter_index: Option<usize>,
    /// `{ "type": "<registered name>", ...builder fields }`.
    pub response: serde_json::Value,
    #[serde(default)]
    pub use_mirror_dial: bool,
    #[serde(default)]
    pub mirror_low_edge: Option<f64>,
    #[serde(default)]
    pub mirror_range: Option<f64>,
    #[serde(default)]
    pub min_dial_response: Option<f64>,
    #[serde(default)]
    pub max_dial_response: Option<f64>,
    #[serde(default)]
    pub apply_condition: Option<DataBin>,
    #[serde(default)]
    pub supervisor: Option<SupervisorConfig>,
}
