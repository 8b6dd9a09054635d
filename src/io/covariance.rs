//! Covariance sources.
//!
//! A parameter set asks its source for the covariance entry stored under the set's
//! name. `CovarianceStore` is the in-memory implementation, filled from inline config
//! entries and/or a standalone JSON file (`{ "<set>": { "matrix": [[..]], ... } }`).

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{CovarianceEntry, ModelConfig};
use crate::error::{Error, Result};
use crate::io::config::read_json as read_json_file;

pub trait CovarianceSource {
    /// Entry for the parameter set called `set_name`.
    fn covariance_entry(&self, set_name: &str) -> Result<&CovarianceEntry>;
}

#[derive(Debug, Clone, Default)]
pub struct CovarianceStore {
    entries: BTreeMap<String, CovarianceEntry>,
}

impl CovarianceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, set_name: impl Into<String>, entry: CovarianceEntry) -> Option<CovarianceEntry> {
        self.entries.insert(set_name.into(), entry)
    }

    pub fn with_entry(mut self, set_name: impl Into<String>, entry: CovarianceEntry) -> Self {
        self.insert(set_name, entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let entries: BTreeMap<String, CovarianceEntry> = read_json_file(path)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "read covariance file");
        Ok(Self { entries })
    }

    /// File entries (if a path is configured) overridden by inline entries.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let mut store = match &config.covariance_file_path {
            Some(path) => Self::read_json(path)?,
            None => Self::new(),
        };
        for (name, entry) in &config.covariances {
            if store.insert(name.clone(), entry.clone()).is_some() {
                tracing::warn!(set = %name, "inline covariance overrides the covariance file entry");
            }
        }
        Ok(store)
    }
}

impl CovarianceSource for CovarianceStore {
    fn covariance_entry(&self, set_name: &str) -> Result<&CovarianceEntry> {
        self.entries
            .get(set_name)
            .ok_or_else(|| Error::config(format!("no covariance matrix for parameter set '{set_name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(v: f64) -> CovarianceEntry {
        CovarianceEntry {
            matrix: vec![vec![v]],
            ..CovarianceEntry::default()
        }
    }

    #[test]
    fn missing_entry_is_a_config_error() {
        let store = CovarianceStore::new().with_entry("flux", entry(1.0));
        assert!(store.covariance_entry("flux").is_ok());
        assert!(matches!(store.covariance_entry("xsec"), Err(Error::Config(_))));
    }

    #[test]
    fn entry_without_matrix_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("fit-dials-cov-nomatrix-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "flux": { "priors": [1.0] } }"#).unwrap();
        let err = CovarianceStore::read_json(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("matrix"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn inline_entries_override_file_entries() {
        let path = std::env::temp_dir().join(format!("fit-dials-cov-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "flux": { "matrix": [[4.0]] }, "xsec": { "matrix": [[2.0]] } }"#).unwrap();
        let mut config = ModelConfig {
            covariance_file_path: Some(path.clone()),
            ..ModelConfig::default()
        };
        config.covariances.insert("flux".to_string(), entry(9.0));

        let store = CovarianceStore::from_config(&config).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.covariance_entry("flux").unwrap().matrix[0][0], 9.0);
        assert_eq!(store.covariance_entry("xsec").unwrap().matrix[0][0], 2.0);
        std::fs::remove_file(path).ok();
    }
}
