// concord-core/src/infrastructure/config/project.rs

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::domain::configuration::ProjectConfig;
use crate::infrastructure::error::InfrastructureError;

const CONFIG_CANDIDATES: [&str; 2] = ["concord_project_conf.yaml", "concord.yaml"];

/// Loads the project configuration. No file means defaults; environment variables win last.
#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    let mut config = match find_main_config(project_dir) {
        Some(config_path) => {
            info!(path = ?config_path, "Loading project configuration");
            load_fragment::<ProjectConfig>(&config_path)?
        }
        None => {
            info!(dir = ?project_dir, "No project configuration found; using defaults");
            ProjectConfig::default()
        }
    };

    // Layering: CONCORD_SESSION_PATH=/tmp/s.json concord status
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn find_main_config(root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|filename| root.join(filename))
        .find(|p| p.is_file())
}

/// Loads a typed configuration fragment from a YAML file.
pub fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path).map_err(|e| {
        InfrastructureError::ConfigError(format!("Failed to read {:?}: {}", path, e))
    })?;
    serde_yaml::from_str(&content).map_err(InfrastructureError::YamlError)
}

fn apply_env_overrides(
    config: &mut ProjectConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), InfrastructureError> {
    if let Some(val) = lookup("CONCORD_SESSION_PATH") {
        info!(old = ?config.session_path, new = ?val, "Overriding session path via ENV");
        config.session_path = val;
    }
    if let Some(val) = lookup("CONCORD_REPORT_PATH") {
        info!(old = ?config.report_path, new = ?val, "Overriding report path via ENV");
        config.report_path = val;
    }
    if let Some(val) = lookup("CONCORD_CHUNK_SIZE") {
        config.engine.chunk_size = positive("CONCORD_CHUNK_SIZE", &val)?;
    }
    if let Some(val) = lookup("CONCORD_WORKERS") {
        config.engine.workers = positive("CONCORD_WORKERS", &val)?;
    }
    Ok(())
}

fn positive(key: &str, raw: &str) -> Result<usize, InfrastructureError> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            InfrastructureError::ConfigError(format!(
                "{} must be a positive integer, got '{}'",
                key, raw
            ))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_falls_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = load_project_config(dir.path())?;
        assert_eq!(config.preview_rows, 10);
        assert_eq!(config.engine.chunk_size, 10_000);
        Ok(())
    }

    #[test]
    fn test_yaml_config_is_loaded() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("concord.yaml"),
            r#"
name: quarterly-close
session-path: state/session.json
engine:
  chunk-size: 500
  range-tolerance: 2.5
  date-formats: ["%d/%m/%Y"]
normalization:
  case_sensitive: true
"#,
        )?;

        let config = load_project_config(dir.path())?;
        assert_eq!(config.name, "quarterly-close");
        assert_eq!(config.session_path, "state/session.json");
        assert_eq!(config.archive_path, ".concord/archive");
        assert_eq!(config.engine.chunk_size, 500);
        assert_eq!(config.engine.workers, 4);
        assert_eq!(config.engine.range_tolerance, 2.5);
        assert!(config.normalization.case_sensitive);
        assert!(!config.normalization.whitespace_sensitive);
        Ok(())
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let env = HashMap::from([
            ("CONCORD_REPORT_PATH", "out"),
            ("CONCORD_WORKERS", "8"),
        ]);
        let mut config = ProjectConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()))?;
        assert_eq!(config.report_path, "out");
        assert_eq!(config.engine.workers, 8);

        let bad = HashMap::from([("CONCORD_CHUNK_SIZE", "0")]);
        assert!(apply_env_overrides(&mut config, |k| bad.get(k).map(|v| v.to_string())).is_err());
        Ok(())
    }

    #[test]
    fn test_broken_yaml_is_reported() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("concord.yaml"), "engine: [unclosed")?;
        assert!(matches!(
            load_project_config(dir.path()),
            Err(InfrastructureError::YamlError(_))
        ));
        Ok(())
    }
}
