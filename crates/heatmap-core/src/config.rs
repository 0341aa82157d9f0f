//! Configuration loading and typed config structures for the heatmap recorder.
//!
//! The canonical configuration lives in `heatmap-config.yaml` next to the
//! host binary. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Sections the host does not understand (such as the demonstration host's
//! `host` section) are ignored here.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed correctly but is unusable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level heatmap configuration.
///
/// All fields have defaults, so a missing file or an empty section yields
/// a working recorder.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HeatmapConfig {
    /// Per-entity sampling cadence.
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Periodic snapshot cadence and output formatting.
    #[serde(default)]
    pub autosave: AutosaveConfig,

    /// Where session files are written.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HeatmapConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `HEATMAP_PROFILE_ROOT` environment variable overrides
    /// `storage.profile_root`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.storage.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check that every interval is a finite, strictly positive number of
    /// seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_interval("sampling.base_interval_secs", self.sampling.base_interval_secs)?;
        check_interval(
            "sampling.vehicle_interval_secs",
            self.sampling.vehicle_interval_secs,
        )?;
        check_interval("autosave.interval_secs", self.autosave.interval_secs)?;
        if self.storage.folder.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "storage.folder must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

fn check_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            reason: format!("{field} must be a positive number of seconds, got {value}"),
        })
    }
}

/// Sampling cadence for AI-controlled entities.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SamplingConfig {
    /// Seconds of active ticks between two samples on foot.
    #[serde(default = "default_base_interval_secs")]
    pub base_interval_secs: f64,

    /// Seconds of active ticks between two samples while mounted. Expected
    /// to be shorter than the base interval.
    #[serde(default = "default_vehicle_interval_secs")]
    pub vehicle_interval_secs: f64,

    /// Take the first sample on the first qualifying tick after activation
    /// instead of waiting a full interval.
    #[serde(default)]
    pub sample_on_activation: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: default_base_interval_secs(),
            vehicle_interval_secs: default_vehicle_interval_secs(),
            sample_on_activation: false,
        }
    }
}

/// Autosave cadence and snapshot formatting.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AutosaveConfig {
    /// Seconds of host ticks between two autosaves.
    #[serde(default = "default_autosave_interval_secs")]
    pub interval_secs: f64,

    /// Write indented JSON instead of a single line.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_autosave_interval_secs(),
            pretty: true,
        }
    }
}

/// Location of session files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Host profile directory. Session files go under
    /// `<profile_root>/<folder>/`.
    #[serde(default = "default_profile_root")]
    pub profile_root: PathBuf,

    /// Sub-directory of the profile root holding session files.
    #[serde(default = "default_folder")]
    pub folder: String,
}

impl StorageConfig {
    /// Apply environment variable overrides.
    ///
    /// - `HEATMAP_PROFILE_ROOT` overrides `profile_root`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HEATMAP_PROFILE_ROOT") {
            self.profile_root = PathBuf::from(val);
        }
    }

    /// Return the directory that holds this session's output file.
    pub fn output_dir(&self) -> PathBuf {
        self.profile_root.join(&self.folder)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            profile_root: default_profile_root(),
            folder: default_folder(),
        }
    }
}

/// Logging output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line records.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Record format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_base_interval_secs() -> f64 {
    10.0
}

const fn default_vehicle_interval_secs() -> f64 {
    5.0
}

const fn default_autosave_interval_secs() -> f64 {
    120.0
}

fn default_profile_root() -> PathBuf {
    PathBuf::from("profile")
}

fn default_folder() -> String {
    "Heatmap".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = HeatmapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.autosave.interval_secs, 120.0);
        assert!(config.autosave.pretty);
        assert_eq!(config.storage.folder, "Heatmap");
        assert!(!config.sampling.sample_on_activation);
        assert!(config.sampling.vehicle_interval_secs < config.sampling.base_interval_secs);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
sampling:
  base_interval_secs: 30
  vehicle_interval_secs: 7.5
  sample_on_activation: true

autosave:
  interval_secs: 60
  pretty: false

storage:
  profile_root: "/srv/server/profiles"
  folder: "Heatmap"

logging:
  level: "debug"
  format: json

host:
  ai_count: 12
"#;

        let config = HeatmapConfig::parse(yaml).unwrap();
        assert_eq!(config.sampling.base_interval_secs, 30.0);
        assert_eq!(config.sampling.vehicle_interval_secs, 7.5);
        assert!(config.sampling.sample_on_activation);
        assert_eq!(config.autosave.interval_secs, 60.0);
        assert!(!config.autosave.pretty);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = HeatmapConfig::parse("autosave:\n  interval_secs: 15\n").unwrap();

        assert_eq!(config.autosave.interval_secs, 15.0);
        // Everything else uses defaults
        assert_eq!(config.sampling, SamplingConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn rejects_non_positive_interval() {
        let err = HeatmapConfig::parse("sampling:\n  base_interval_secs: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("sampling.base_interval_secs"));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = HeatmapConfig::parse("autosave: [unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn output_dir_joins_folder() {
        let storage = StorageConfig {
            profile_root: PathBuf::from("/srv/profiles"),
            folder: "Heatmap".to_owned(),
        };
        assert_eq!(storage.output_dir(), PathBuf::from("/srv/profiles/Heatmap"));
    }
}
