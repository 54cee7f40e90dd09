//! Configuration file support for Emberwatch
//!
//! Loads station-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.emberwatchrc.json` in the working directory
//! 3. `emberwatch.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.
//! Relative file paths (model, scaler, file sources) resolve against the
//! config file's directory.

use crate::dataset::DEFAULT_TIMESTAMP_COLUMN;
use crate::features::{ColumnMap, Feature};
use crate::locale::Locale;
use crate::monitor::SnapshotSettings;
use crate::report::DEFAULT_LABEL_COLUMN;
use crate::source::DataSource;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default classifier artifact path
pub const DEFAULT_MODEL_PATH: &str = "RHSEM_IoT_Model.json";

/// Default scaler artifact path
pub const DEFAULT_SCALER_PATH: &str = "scaler.json";

/// Default refresh interval for watch mode
pub const DEFAULT_REFRESH_SECS: u64 = 3;

/// Default HTTP timeout for fetching the dataset
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Emberwatch configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmberwatchConfig {
    /// Dataset location: file path or http(s) URL
    #[serde(default)]
    pub source: Option<String>,

    /// Classifier artifact path (default: RHSEM_IoT_Model.json)
    #[serde(default)]
    pub model: Option<PathBuf>,

    /// Scaler artifact path (default: scaler.json)
    #[serde(default)]
    pub scaler: Option<PathBuf>,

    /// Seconds between refresh cycles in watch mode (default: 3)
    #[serde(default)]
    pub refresh_secs: Option<u64>,

    /// HTTP timeout in seconds (default: 30)
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,

    /// Banner language: "id" or "en" (default: id)
    #[serde(default)]
    pub locale: Option<String>,

    /// Name of the timestamp column (default: Waktu)
    #[serde(default)]
    pub timestamp_column: Option<String>,

    /// Name of the appended label column in exports (default: Prediksi Kebakaran)
    #[serde(default)]
    pub label_column: Option<String>,

    /// Column aliases per feature, replacing the built-in aliases
    #[serde(default)]
    pub columns: Option<ColumnConfig>,
}

/// Accepted column names per feature, first match wins
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub temperature: Option<Vec<String>>,
    pub humidity: Option<Vec<String>>,
    pub rainfall: Option<Vec<String>>,
    pub wind_speed: Option<Vec<String>>,
    pub soil_moisture: Option<Vec<String>>,
}

impl ColumnConfig {
    fn entries(&self) -> [(Feature, Option<&Vec<String>>); 5] {
        [
            (Feature::Temperature, self.temperature.as_ref()),
            (Feature::Humidity, self.humidity.as_ref()),
            (Feature::Rainfall, self.rainfall.as_ref()),
            (Feature::WindSpeed, self.wind_speed.as_ref()),
            (Feature::SoilMoisture, self.soil_moisture.as_ref()),
        ]
    }
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub source: Option<DataSource>,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
    pub locale: Locale,
    pub timestamp_column: String,
    pub label_column: String,
    pub columns: ColumnMap,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl EmberwatchConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(secs) = self.refresh_secs {
            if secs == 0 {
                anyhow::bail!("refresh_secs must be positive (got {})", secs);
            }
        }

        if let Some(secs) = self.fetch_timeout_secs {
            if secs == 0 {
                anyhow::bail!("fetch_timeout_secs must be positive (got {})", secs);
            }
        }

        if let Some(ref locale) = self.locale {
            locale
                .parse::<Locale>()
                .map_err(|e| anyhow::anyhow!("locale: {}", e))?;
        }

        if let Some(ref source) = self.source {
            if source.trim().is_empty() {
                anyhow::bail!("source must not be empty");
            }
        }

        for (name, value) in [
            ("timestamp_column", &self.timestamp_column),
            ("label_column", &self.label_column),
        ] {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    anyhow::bail!("{} must not be empty", name);
                }
            }
        }

        if let Some(ref columns) = self.columns {
            for (feature, aliases) in columns.entries() {
                if let Some(aliases) = aliases {
                    if aliases.is_empty() {
                        anyhow::bail!(
                            "columns.{} must list at least one column name",
                            feature.key()
                        );
                    }
                    if aliases.iter().any(|a| a.trim().is_empty()) {
                        anyhow::bail!("columns.{} contains an empty column name", feature.key());
                    }
                }
            }
        }

        Ok(())
    }

    /// Resolve config into the form used by the pipeline and CLI
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let locale = match &self.locale {
            Some(l) => l.parse::<Locale>().map_err(|e| anyhow::anyhow!(e))?,
            None => Locale::default(),
        };

        let mut columns = ColumnMap::default();
        if let Some(ref config) = self.columns {
            for (feature, aliases) in config.entries() {
                if let Some(aliases) = aliases {
                    columns = columns.with_aliases(feature, aliases.clone());
                }
            }
        }

        Ok(ResolvedConfig {
            source: self.source.as_deref().map(DataSource::parse),
            model_path: self
                .model
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            scaler_path: self
                .scaler
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCALER_PATH)),
            refresh_interval: Duration::from_secs(
                self.refresh_secs.unwrap_or(DEFAULT_REFRESH_SECS),
            ),
            fetch_timeout: Duration::from_secs(
                self.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
            locale,
            timestamp_column: self
                .timestamp_column
                .clone()
                .unwrap_or_else(|| DEFAULT_TIMESTAMP_COLUMN.to_string()),
            label_column: self
                .label_column
                .clone()
                .unwrap_or_else(|| DEFAULT_LABEL_COLUMN.to_string()),
            columns,
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        EmberwatchConfig::default().resolve()
    }

    pub fn snapshot_settings(&self) -> SnapshotSettings {
        SnapshotSettings {
            timestamp_column: self.timestamp_column.clone(),
            locale: self.locale,
        }
    }

    /// Artifact and file source paths are relative to the config file's directory
    fn anchor_paths(&mut self) {
        let Some(base) = self.config_path.as_ref().and_then(|p| p.parent()) else {
            return;
        };
        if self.model_path.is_relative() {
            self.model_path = base.join(&self.model_path);
        }
        if self.scaler_path.is_relative() {
            self.scaler_path = base.join(&self.scaler_path);
        }
        if let Some(DataSource::File(path)) = &mut self.source {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.emberwatchrc.json`
/// 2. `emberwatch.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(EmberwatchConfig, PathBuf)>> {
    for name in [".emberwatchrc.json", "emberwatch.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<EmberwatchConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: EmberwatchConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (EmberwatchConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    resolved.anchor_paths();
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = EmberwatchConfig::default();
        config.validate().expect("default config should be valid");
        let resolved = config.resolve().expect("default config should resolve");
        assert!(resolved.source.is_none());
        assert_eq!(resolved.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(resolved.scaler_path, PathBuf::from(DEFAULT_SCALER_PATH));
        assert_eq!(resolved.refresh_interval, Duration::from_secs(3));
        assert_eq!(resolved.locale, Locale::Indonesian);
        assert_eq!(resolved.timestamp_column, "Waktu");
        assert_eq!(resolved.label_column, "Prediksi Kebakaran");
        assert_eq!(resolved.columns, ColumnMap::default());
    }

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{}"#;
        let config: EmberwatchConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "source": "https://example.com/sheet/export?format=csv",
            "model": "models/rhsem.json",
            "scaler": "models/scaler.json",
            "refresh_secs": 60,
            "fetch_timeout_secs": 5,
            "locale": "en",
            "timestamp_column": "Timestamp",
            "label_column": "Risk",
            "columns": {
                "temperature": ["Temp (C)"],
                "soil_moisture": ["Soil", "Soil Moisture"]
            }
        }"#;
        let config: EmberwatchConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(
            resolved.source,
            Some(DataSource::Url(
                "https://example.com/sheet/export?format=csv".to_string()
            ))
        );
        assert_eq!(resolved.refresh_interval, Duration::from_secs(60));
        assert_eq!(resolved.fetch_timeout, Duration::from_secs(5));
        assert_eq!(resolved.locale, Locale::English);
        assert_eq!(resolved.label_column, "Risk");
        assert_eq!(resolved.columns.aliases(Feature::Temperature), &["Temp (C)"]);
        assert_eq!(
            resolved.columns.aliases(Feature::SoilMoisture),
            &["Soil", "Soil Moisture"]
        );
        assert_eq!(
            resolved.columns.aliases(Feature::Humidity),
            ColumnMap::default().aliases(Feature::Humidity)
        );
        let settings = resolved.snapshot_settings();
        assert_eq!(settings.timestamp_column, "Timestamp");
    }

    #[test]
    fn test_reject_unknown_fields() {
        let json = r#"{"unknown_field": true}"#;
        let result: Result<EmberwatchConfig, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown fields should be rejected");
    }

    #[test]
    fn test_reject_zero_refresh() {
        let json = r#"{"refresh_secs": 0}"#;
        let config: EmberwatchConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_unknown_locale() {
        let json = r#"{"locale": "fr"}"#;
        let config: EmberwatchConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_empty_alias_list() {
        let json = r#"{"columns": {"rainfall": []}}"#;
        let config: EmberwatchConfig = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("columns.rainfall"));
    }

    #[test]
    fn test_discover_rc_file_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".emberwatchrc.json"), r#"{"refresh_secs": 10}"#).unwrap();
        fs::write(dir.path().join("emberwatch.config.json"), r#"{"refresh_secs": 20}"#).unwrap();
        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.refresh_secs, Some(10));
        assert!(path.ends_with(".emberwatchrc.json"));
    }

    #[test]
    fn test_discover_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
    }

    #[test]
    fn test_artifact_paths_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("station.json");
        fs::write(
            &config_path,
            r#"{"model": "models/m.json", "scaler": "/abs/scaler.json"}"#,
        )
        .unwrap();
        let resolved = load_and_resolve(Path::new("."), Some(&config_path)).unwrap();
        assert_eq!(resolved.model_path, dir.path().join("models/m.json"));
        assert_eq!(resolved.scaler_path, PathBuf::from("/abs/scaler.json"));
    }

    #[test]
    fn test_file_source_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("station.json");
        fs::write(&config_path, r#"{"source": "data/sensors.csv"}"#).unwrap();
        let resolved = load_and_resolve(Path::new("."), Some(&config_path)).unwrap();
        assert_eq!(
            resolved.source,
            Some(DataSource::File(dir.path().join("data/sensors.csv")))
        );

        fs::write(&config_path, r#"{"source": "https://example.com/a.csv"}"#).unwrap();
        let resolved = load_and_resolve(Path::new("."), Some(&config_path)).unwrap();
        assert_eq!(
            resolved.source,
            Some(DataSource::Url("https://example.com/a.csv".to_string()))
        );
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("bad.json");
        fs::write(&config_path, "{ not json").unwrap();
        let err = load_config_file(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.json"));
    }
}
