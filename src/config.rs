//! Configuration management
//!
//! Every stage of the pipeline reads its settings from [`Config`], which is
//! loaded from a TOML file or falls back to defaults matching the
//! earthquake dataset layout.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::tuning::ParamGrid;

/// Column selection and cleaning rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Binary outcome column (1 = tsunami)
    pub outcome: String,
    /// Continuous predictors kept after feature selection
    pub numeric: Vec<String>,
    /// Categorical predictors kept after feature selection
    pub nominal: Vec<String>,
    /// Nominal columns whose missing values are filled with the column mode
    pub impute_mode: Vec<String>,
    /// Optional timestamp column used to derive `year` and `month`
    pub date_column: Option<String>,
    /// `chrono` format string for `date_column`
    pub date_format: String,
    /// Add `year` and `month` numeric predictors from `date_column`
    pub derive_date_parts: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            outcome: "tsunami".to_string(),
            numeric: [
                "magnitude", "cdi", "mmi", "sig", "nst", "dmin", "gap", "depth", "latitude",
                "longitude",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            nominal: vec!["alert".to_string()],
            impute_mode: vec!["alert".to_string()],
            date_column: Some("date_time".to_string()),
            date_format: "%d-%m-%Y %H:%M".to_string(),
            derive_date_parts: true,
        }
    }
}

/// Train/test split and resampling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Proportion of rows assigned to training
    pub prop: f64,
    /// Number of cross-validation folds
    pub folds: usize,
    /// Seed shared by the split, the folds and stochastic models
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            prop: 0.75,
            folds: 5,
            seed: 42,
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            cache_dir: PathBuf::from("cache"),
            use_cache: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub grids: ParamGrid,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("Invalid config: {:?}", path))?;
        Ok(config)
    }

    /// Load configuration from file or use default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Using default configuration, {:?} was not loaded: {:#}", path.as_ref(), e);
                Self::default()
            }
        }
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config: {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.data.outcome, "tsunami");
        assert_eq!(config.split.folds, 5);
        assert!(config.data.impute_mode.contains(&"alert".to_string()));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data.numeric, config.data.numeric);
        assert_eq!(parsed.grids.knn.neighbors, config.grids.knn.neighbors);
    }

    #[test]
    fn test_load_or_default_falls_back_on_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tsunami.toml");
        std::fs::write(&path, "[split]\nfolds = \"five\"\n").unwrap();
        assert!(Config::load(&path).is_err());

        let config = Config::load_or_default(&path);
        assert_eq!(config.split.folds, 5);

        let missing = Config::load_or_default(dir.path().join("absent.toml"));
        assert_eq!(missing.split.seed, 42);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[split]\nfolds = 3\n").unwrap();
        assert_eq!(parsed.split.folds, 3);
        assert_eq!(parsed.split.seed, 42);
        assert_eq!(parsed.data.outcome, "tsunami");
    }
}
