//! Run configuration
//!
//! Loaded from a TOML file (all keys optional), then overridden by
//! environment variables, then by command-line flags.

use std::path::Path;

use serde::Deserialize;

use crate::error::{RelayError, Result};
use crate::health::HealthField;

/// Longest window either pipeline accepts, in days
pub const MAX_DAYS: u32 = 3650;

/// Check a day count from configuration or the command line
pub fn validate_days(name: &str, days: u32) -> Result<()> {
    if days == 0 {
        return Err(RelayError::config(format!("{} must be at least 1", name)));
    }
    if days > MAX_DAYS {
        return Err(RelayError::config(format!(
            "{} must be at most {} (got {})",
            name, MAX_DAYS, days
        )));
    }
    Ok(())
}

/// Full configuration for both pipelines
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub garmin: GarminConfig,
    pub influxdb: InfluxConfig,
    pub inference: InferenceConfig,
    pub collect: CollectConfig,
    pub report: ReportConfig,
}

/// Garmin Connect access
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GarminConfig {
    /// Connect domain (`garmin.com`, or `garmin.cn` for China accounts)
    pub domain: String,
    /// Token profile written by `garmin auth login`
    pub profile: String,
    /// Explicit OAuth2 access token, bypassing the stored profile
    pub access_token: Option<String>,
}

impl Default for GarminConfig {
    fn default() -> Self {
        Self {
            domain: "garmin.com".to_string(),
            profile: "default".to_string(),
            access_token: None,
        }
    }
}

/// InfluxDB v2 connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    /// Measurement the daily points are written to
    pub measurement: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            token: String::new(),
            org: String::new(),
            bucket: "garmin".to_string(),
            measurement: "health_data".to_string(),
        }
    }
}

impl InfluxConfig {
    /// Check the settings needed to actually talk to InfluxDB
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("influxdb.url", &self.url),
            ("influxdb.token", &self.token),
            ("influxdb.org", &self.org),
            ("influxdb.bucket", &self.bucket),
            ("influxdb.measurement", &self.measurement),
        ] {
            if value.trim().is_empty() {
                return Err(RelayError::config(format!("{} is not set", name)));
            }
        }
        Ok(())
    }
}

/// Local completion endpoint (LM Studio or compatible)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub url: String,
    /// Model identifier forwarded in the request body when set
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:1234/v1/completions".to_string(),
            model: None,
            max_tokens: None,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Number of days to collect, counting today
    pub days: u32,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self { days: 7 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of days to report on, counting today
    pub days: u32,
    /// Field names read back from the store
    pub fields: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            days: 7,
            fields: HealthField::known_names(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one the default location is
    /// tried and a missing file means defaults. Environment overrides are
    /// applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    RelayError::config(format!("Cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&text)?
            }
            None => {
                let default = super::default_config_path()?;
                if default.exists() {
                    tracing::debug!(path = %default.display(), "loading config");
                    Self::from_toml_str(&std::fs::read_to_string(&default)?)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in practice)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("INFLUXDB_URL") {
            self.influxdb.url = v;
        }
        if let Some(v) = lookup("INFLUXDB_TOKEN") {
            self.influxdb.token = v;
        }
        if let Some(v) = lookup("INFLUXDB_ORG") {
            self.influxdb.org = v;
        }
        if let Some(v) = lookup("INFLUXDB_BUCKET") {
            self.influxdb.bucket = v;
        }
        if let Some(v) = lookup("LM_STUDIO_URL") {
            self.inference.url = v;
        }
        if let Some(v) = lookup("GARMIN_ACCESS_TOKEN") {
            self.garmin.access_token = Some(v);
        }
        if let Some(v) = lookup("GARMIN_PROFILE") {
            self.garmin.profile = v;
        }
    }

    /// Check values that would make either pipeline meaningless
    pub fn validate(&self) -> Result<()> {
        validate_days("collect.days", self.collect.days)?;
        validate_days("report.days", self.report.days)?;
        if self.inference.url.trim().is_empty() {
            return Err(RelayError::config("inference.url is not set"));
        }
        if self.report.fields.is_empty() {
            return Err(RelayError::config("report.fields must name at least one field"));
        }
        for field in &self.report.fields {
            field.parse::<HealthField>().map_err(RelayError::config)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.influxdb.measurement, "health_data");
        assert_eq!(config.collect.days, 7);
        assert_eq!(config.report.fields.len(), HealthField::ALL.len());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [influxdb]
            token = "secret"
            org = "home"

            [collect]
            days = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.influxdb.token, "secret");
        assert_eq!(config.influxdb.bucket, "garmin");
        assert_eq!(config.collect.days, 3);
        assert_eq!(config.report.days, 7);
        assert!(config.influxdb.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = Config::from_toml_str("[collect]\ndays = \"seven\"").unwrap_err();
        assert!(matches!(err, RelayError::TomlParse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("INFLUXDB_URL", "http://influx:8086"),
            ("LM_STUDIO_URL", "http://llm:1234/v1/completions"),
            ("GARMIN_ACCESS_TOKEN", "abc"),
            ("INFLUXDB_ORG", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.influxdb.org = "from-file".to_string();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.influxdb.url, "http://influx:8086");
        assert_eq!(config.inference.url, "http://llm:1234/v1/completions");
        assert_eq!(config.garmin.access_token.as_deref(), Some("abc"));
        // Blank values do not override
        assert_eq!(config.influxdb.org, "from-file");
    }

    #[test]
    fn test_validate_rejects_zero_days_and_unknown_fields() {
        let mut config = Config::default();
        config.collect.days = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.report.fields = vec!["total_steps".to_string(), "vo2max".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vo2max"));
    }

    #[test]
    fn test_validate_rejects_oversized_days() {
        let config = Config::from_toml_str("[report]\ndays = 4000000000\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
        assert!(err.to_string().contains("report.days"));

        assert!(validate_days("--days", MAX_DAYS).is_ok());
        assert!(validate_days("--days", MAX_DAYS + 1).is_err());
        assert!(validate_days("--days", u32::MAX).is_err());
    }

    #[test]
    fn test_influx_validate_requires_token() {
        let err = InfluxConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("influxdb.token"));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[report]\ndays = 14\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.report.days, 14);
    }
}
