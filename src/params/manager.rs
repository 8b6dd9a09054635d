//! Every parameter set of a model.

use std::sync::Arc;

use rand::Rng;

use crate::domain::ParameterSetConfig;
use crate::error::{Error, Result};
use crate::io::CovarianceSource;
use crate::params::{Parameter, ParameterSet};

#[derive(Debug, Default)]
pub struct ParametersManager {
    sets: Vec<ParameterSet>,
}

impl ParametersManager {
    pub fn new(configs: impl IntoIterator<Item = ParameterSetConfig>) -> Result<Self> {
        let mut sets: Vec<ParameterSet> = Vec::new();
        for config in configs {
            if sets.iter().any(|s| s.name() == config.name) {
                return Err(Error::config(format!("duplicate parameter set '{}'", config.name)));
            }
            sets.push(ParameterSet::new(config));
        }
        Ok(Self { sets })
    }

    /// Initialize every set; the first failure aborts the load.
    pub fn initialize(&mut self, source: &dyn CovarianceSource) -> Result<()> {
        for set in &mut self.sets {
            set.initialize(source)?;
        }
        tracing::info!(
            sets = self.sets.len(),
            parameters = self.sets.iter().map(|s| s.nb_parameters()).sum::<usize>(),
            "parameters manager initialized"
        );
        Ok(())
    }

    pub fn sets(&self) -> &[ParameterSet] {
        &self.sets
    }

    pub fn set(&self, name: &str) -> Option<&ParameterSet> {
        self.sets.iter().find(|s| s.name() == name)
    }

    /// Resolve `"<set>/<parameter>"`, where the parameter part is a name or a `#<index>` title.
    pub fn find_parameter(&self, path: &str) -> Result<&Arc<Parameter>> {
        let (set_name, key) = path
            .split_once('/')
            .ok_or_else(|| Error::config(format!("parameter path '{path}' is not of the form <set>/<parameter>")))?;
        let set = self
            .set(set_name)
            .ok_or_else(|| Error::config(format!("unknown parameter set '{set_name}'")))?;
        set.find_parameter(key)
            .ok_or_else(|| Error::config(format!("unknown parameter '{key}' in set '{set_name}'")))
    }

    /// Sum of the per-set penalty terms.
    pub fn chi2(&self) -> Result<f64> {
        self.sets.iter().map(ParameterSet::chi2).sum()
    }

    /// Throw the sets flagged for pre-fit throws, or every set when `all` is set.
    pub fn throw_parameters<R: Rng + ?Sized>(&self, rng: &mut R, n_sigma: f64, all: bool) -> Result<usize> {
        let mut thrown = 0;
        for set in self.sets.iter().filter(|s| all || s.throw_before_fit()) {
            set.throw_parameters(rng, n_sigma)?;
            thrown += 1;
        }
        Ok(thrown)
    }

    pub fn move_to_prior(&self) {
        for set in &self.sets {
            set.move_to_prior();
        }
    }

    pub fn summary(&self) -> String {
        self.sets.iter().map(ParameterSet::summary).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::CovarianceEntry;
    use crate::io::CovarianceStore;

    fn manager() -> ParametersManager {
        let source = CovarianceStore::new()
            .with_entry(
                "flux",
                CovarianceEntry {
                    matrix: vec![vec![0.01, 0.0], vec![0.0, 0.04]],
                    names: Some(vec!["nue".into(), "numu".into()]),
                    ..CovarianceEntry::default()
                },
            )
            .with_entry(
                "xsec",
                CovarianceEntry {
                    matrix: vec![vec![0.25]],
                    ..CovarianceEntry::default()
                },
            );
        let configs = vec![
            ParameterSetConfig {
                enable_throw_mc_before_fit: true,
                ..ParameterSetConfig::new("flux")
            },
            ParameterSetConfig::new("xsec"),
        ];
        let mut manager = ParametersManager::new(configs).unwrap();
        manager.initialize(&source).unwrap();
        manager
    }

    #[test]
    fn chi2_sums_over_sets() {
        let m = manager();
        assert_eq!(m.chi2().unwrap(), 0.0);
        m.find_parameter("flux/numu").unwrap().set_value(1.2).unwrap();
        m.find_parameter("xsec/#0").unwrap().set_value(1.5).unwrap();
        // 0.2² / 0.04 + 0.5² / 0.25
        assert!((m.chi2().unwrap() - 2.0).abs() < 1e-12);
        m.move_to_prior();
        assert_eq!(m.chi2().unwrap(), 0.0);
    }

    #[test]
    fn only_flagged_sets_are_thrown_by_default() {
        let m = manager();
        let mut rng = StdRng::seed_from_u64(17);
        assert_eq!(m.throw_parameters(&mut rng, 1.0, false).unwrap(), 1);
        assert_eq!(m.set("xsec").unwrap().parameter(0).unwrap().value(), 1.0);
        assert_eq!(m.throw_parameters(&mut rng, 1.0, true).unwrap(), 2);
        assert_ne!(m.set("xsec").unwrap().parameter(0).unwrap().value(), 1.0);
    }

    #[test]
    fn bad_paths_are_config_errors() {
        let m = manager();
        assert!(matches!(m.find_parameter("flux"), Err(Error::Config(_))));
        assert!(matches!(m.find_parameter("beam/nue"), Err(Error::Config(_))));
        assert!(matches!(m.find_parameter("flux/nutau"), Err(Error::Config(_))));
    }

    #[test]
    fn duplicate_set_names_are_rejected() {
        let configs = vec![ParameterSetConfig::new("flux"), ParameterSetConfig::new("flux")];
        assert!(matches!(ParametersManager::new(configs), Err(Error::Config(_))));
    }
}
