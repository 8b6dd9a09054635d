//! Read model configuration JSON files.
//!
//! The schema is defined by `domain::ModelConfig`. Paths inside the file are resolved
//! against the directory holding the configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::domain::ModelConfig;
use crate::error::{Error, Result};

/// Open `path`, keeping the path in the error message.
pub(crate) fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("failed to open '{}': {e}", path.display()))))?;
    Ok(BufReader::new(file))
}

/// Deserialize a JSON file.
///
/// Well-formed JSON that does not fit the schema (missing or mistyped fields) is a
/// `Config` error; malformed JSON stays a `Json` error.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    serde_json::from_reader(open(path)?).map_err(|e| match e.classify() {
        Category::Data => Error::config(format!("invalid '{}': {e}", path.display())),
        _ => Error::Json(e),
    })
}

/// Read and validate a model configuration.
pub fn read_model_config(path: &Path) -> Result<ModelConfig> {
    let mut config: ModelConfig = read_json(path)?;
    if let Some(cov_path) = &config.covariance_file_path {
        config.covariance_file_path = Some(resolve_relative(path, cov_path));
    }
    for set in &config.parameter_sets {
        set.validate()?;
    }
    tracing::info!(
        path = %path.display(),
        parameter_sets = config.parameter_sets.len(),
        "loaded model configuration"
    );
    Ok(config)
}

/// `target` as is when absolute, otherwise relative to `config_path`'s directory.
pub fn resolve_relative(config_path: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match config_path.parent() {
        Some(dir) => dir.join(target),
        None => target.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fit-dials-config-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("model.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_config_and_resolves_covariance_path() {
        let path = write_temp(
            "ok",
            r#"{
                "covarianceFilePath": "cov.json",
                "parameterSets": [ { "name": "flux", "maxEigenFraction": 0.95 } ]
            }"#,
        );
        let config = read_model_config(&path).unwrap();
        assert_eq!(config.parameter_sets.len(), 1);
        assert!(config.parameter_sets[0].uses_eigen_decomposition());
        let cov = config.covariance_file_path.unwrap();
        assert_eq!(cov, path.parent().unwrap().join("cov.json"));
    }

    #[test]
    fn missing_set_name_is_rejected() {
        let path = write_temp("noname", r#"{ "parameterSets": [ { "isEnabled": true } ] }"#);
        let err = read_model_config(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("missing field `name`"));
        assert!(err.to_string().contains("model.json"));
    }

    #[test]
    fn malformed_json_stays_a_json_error() {
        let path = write_temp("syntax", r#"{ "parameterSets": [ "#);
        assert!(matches!(read_model_config(&path), Err(Error::Json(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_model_config(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn absolute_targets_are_kept() {
        let p = resolve_relative(Path::new("/a/b/model.json"), Path::new("/c/cov.json"));
        assert_eq!(p, PathBuf::from("/c/cov.json"));
        let p = resolve_relative(Path::new("/a/b/model.json"), Path::new("cov.json"));
        assert_eq!(p, PathBuf::from("/a/b/cov.json"));
    }
}
