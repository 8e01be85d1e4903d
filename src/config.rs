// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Scanalyzer configuration

use crate::io::{ANALYSIS_LOG, SIMPLIFICATION_LOG};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "scanalyzer.toml";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Trained simplification-level model
    pub model_path: PathBuf,
    /// Directory holding the CSV logs
    pub data_dir: PathBuf,
    /// Default JSON report destination
    pub report_path: PathBuf,
    /// Meshes above this triangle count are decimated before preview export
    pub display_triangle_cap: usize,
    /// Dihedral angle (degrees) above which an edge counts as sharp
    pub sharp_angle_degrees: f64,
    /// Append every analysis to `analysis_logs.csv`
    pub log_analysis: bool,
    /// Append every simplification to `simplification_logs.csv`
    pub log_simplification: bool,
    /// One of error, warn, info, debug, trace
    pub log_level: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/simplification_model.json"),
            data_dir: PathBuf::from("data"),
            report_path: PathBuf::from("scanalyzer_report.json"),
            display_triangle_cap: 100_000,
            sharp_angle_degrees: 30.0,
            log_analysis: true,
            log_simplification: true,
            log_level: "info".to_string(),
        }
    }
}

impl ScanConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: ScanConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// An explicit path must exist; otherwise `scanalyzer.toml` is used when
    /// present and the defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(CONFIG_FILE)?,
            None => Self::default(),
        };

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `SCANALYZER_*` overrides read through `var`
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(model) = var("SCANALYZER_MODEL_PATH") {
            self.model_path = PathBuf::from(model);
        }

        if let Some(data_dir) = var("SCANALYZER_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Some(level) = var("SCANALYZER_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(cap) = var("SCANALYZER_DISPLAY_CAP") {
            self.display_triangle_cap = cap
                .trim()
                .parse()
                .with_context(|| format!("Invalid SCANALYZER_DISPLAY_CAP: {:?}", cap))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn simplification_log_path(&self) -> PathBuf {
        self.data_dir.join(SIMPLIFICATION_LOG)
    }

    pub fn analysis_log_path(&self) -> PathBuf {
        self.data_dir.join(ANALYSIS_LOG)
    }

    /// Parsed log level, `info` when unrecognised
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let file = NamedTempFile::with_suffix(".toml")?;
        let mut config = ScanConfig::default();
        config.display_triangle_cap = 5_000;
        config.sharp_angle_degrees = 45.0;
        config.save(file.path())?;

        let loaded = ScanConfig::from_file(file.path())?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let file = NamedTempFile::with_suffix(".toml")?;
        std::fs::write(file.path(), "data_dir = \"logs\"\n")?;

        let loaded = ScanConfig::from_file(file.path())?;
        assert_eq!(loaded.data_dir, PathBuf::from("logs"));
        assert_eq!(loaded.display_triangle_cap, 100_000);
        assert_eq!(
            loaded.simplification_log_path(),
            PathBuf::from("logs/simplification_logs.csv")
        );
        Ok(())
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let vars: HashMap<&str, &str> = [
            ("SCANALYZER_MODEL_PATH", "models/tree.json"),
            ("SCANALYZER_DATA_DIR", "/var/scans"),
            ("SCANALYZER_LOG_LEVEL", "debug"),
            ("SCANALYZER_DISPLAY_CAP", " 2500 "),
        ]
        .into_iter()
        .collect();

        let mut config = ScanConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()))?;

        assert_eq!(config.model_path, PathBuf::from("models/tree.json"));
        assert_eq!(config.analysis_log_path(), PathBuf::from("/var/scans/analysis_logs.csv"));
        assert_eq!(config.level_filter(), log::LevelFilter::Debug);
        assert_eq!(config.display_triangle_cap, 2500);
        assert!(config.log_analysis);
        Ok(())
    }

    #[test]
    fn test_bad_display_cap_is_an_error() {
        let mut config = ScanConfig::default();
        let err = config
            .apply_overrides(|name| (name == "SCANALYZER_DISPLAY_CAP").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("SCANALYZER_DISPLAY_CAP"));
        assert_eq!(config.display_triangle_cap, 100_000);

        let mut untouched = ScanConfig::default();
        untouched.apply_overrides(|_| None).unwrap();
        assert_eq!(untouched, ScanConfig::default());
    }

    #[test]
    fn test_level_filter() {
        let mut config = ScanConfig::default();
        config.log_level = "debug".into();
        assert_eq!(config.level_filter(), log::LevelFilter::Debug);
        config.log_level = "nonsense".into();
        assert_eq!(config.level_filter(), log::LevelFilter::Info);
    }
}
