use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Complete rainsense configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RainsenseConfig {
    #[serde(default)]
    pub home: HomeConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// One entry per `[[sensor]]` block
    #[serde(default, rename = "sensor")]
    pub sensors: Vec<IntegrationConfig>,
}

/// Host location, used when an integration does not set its own coordinates
#[derive(Debug, Clone, Deserialize)]
pub struct HomeConfig {
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
}

fn default_latitude() -> f64 {
    35.6895
}

fn default_longitude() -> f64 {
    139.6917
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
        }
    }
}

/// Query API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_port() -> u16 {
    8123
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            port: default_api_port(),
        }
    }
}

/// Integration platforms understood by the fetcher manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Live precipitation forecast from the Yahoo! weather API
    YahooPrecipitation,
    /// Random number/message stub
    Sample,
    /// Random pressure stub
    JrWest,
}

impl Platform {
    pub fn key(&self) -> &'static str {
        match self {
            Platform::YahooPrecipitation => "yahoo_precipitation",
            Platform::Sample => "sample",
            Platform::JrWest => "jr_west",
        }
    }

    /// Whether setup must abort without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Platform::YahooPrecipitation)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One configured integration (`[[sensor]]` block)
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationConfig {
    pub platform: Platform,
    /// Client name prefix for entity names; platform default when absent
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Sensor type keys; platform default when absent.
    /// Checked against the platform's sensor table at setup.
    #[serde(default)]
    pub monitored_conditions: Option<Vec<String>>,
}

impl IntegrationConfig {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            name: None,
            api_key: None,
            latitude: None,
            longitude: None,
            monitored_conditions: None,
        }
    }

    /// Coordinates for this integration, falling back to the home location.
    pub fn coordinates(&self, home: &HomeConfig) -> (f64, f64) {
        (
            self.latitude.unwrap_or(home.latitude),
            self.longitude.unwrap_or(home.longitude),
        )
    }

    /// The API key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Configuration errors found by [`RainsenseConfig::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidLatitude(f64),
    InvalidLongitude(f64),
    EmptyMonitoredConditions(Platform),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidLatitude(v) => {
                write!(f, "latitude must be within [-90, 90], got {}", v)
            }
            ConfigError::InvalidLongitude(v) => {
                write!(f, "longitude must be within [-180, 180], got {}", v)
            }
            ConfigError::EmptyMonitoredConditions(platform) => {
                write!(f, "{}: monitored_conditions needs at least one entry", platform)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn check_latitude(v: f64) -> Result<(), ConfigError> {
    if (-90.0..=90.0).contains(&v) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLatitude(v))
    }
}

fn check_longitude(v: f64) -> Result<(), ConfigError> {
    if (-180.0..=180.0).contains(&v) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLongitude(v))
    }
}

impl RainsenseConfig {
    /// Validates coordinate ranges and monitored condition list lengths.
    ///
    /// Sensor type keys are validated later against each platform's table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_latitude(self.home.latitude)?;
        check_longitude(self.home.longitude)?;

        for sensor in &self.sensors {
            if let Some(lat) = sensor.latitude {
                check_latitude(lat)?;
            }
            if let Some(lon) = sensor.longitude {
                check_longitude(lon)?;
            }
            if let Some(conditions) = &sensor.monitored_conditions {
                if conditions.is_empty() {
                    return Err(ConfigError::EmptyMonitoredConditions(sensor.platform));
                }
            }
        }
        Ok(())
    }

    /// Fills missing API keys of key-requiring integrations from `RAINSENSE_API_KEY`.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("RAINSENSE_API_KEY") {
            for sensor in &mut self.sensors {
                if sensor.platform.requires_api_key() && sensor.api_key().is_none() {
                    sensor.api_key = Some(key.clone());
                }
            }
        }
    }
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(contents: &str) -> Result<RainsenseConfig> {
    let config: RainsenseConfig =
        toml::from_str(contents).context("Failed to parse configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<RainsenseConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let mut config = parse_config(&contents)?;
    config.apply_env();
    info!(
        path = %path.display(),
        integrations = config.sensors.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Load configuration, using defaults when the file does not exist
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<RainsenseConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(RainsenseConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RainsenseConfig::default();
        assert_eq!(config.home.latitude, 35.6895);
        assert_eq!(config.home.longitude, 139.6917);
        assert!(config.api.enabled);
        assert_eq!(config.api.port, 8123);
        assert!(config.sensors.is_empty());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [home]
            latitude = 35.0
            longitude = 135.7

            [api]
            port = 9000

            [[sensor]]
            platform = "yahoo_precipitation"
            name = "Kyoto Rain"
            api_key = "secret"
            monitored_conditions = ["rainfall", "digest"]

            [[sensor]]
            platform = "sample"

            [[sensor]]
            platform = "jr_west"
            latitude = 34.7
            longitude = 135.5
        "#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.home.latitude, 35.0);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.sensors.len(), 3);

        let rain = &config.sensors[0];
        assert_eq!(rain.platform, Platform::YahooPrecipitation);
        assert_eq!(rain.name.as_deref(), Some("Kyoto Rain"));
        assert_eq!(rain.api_key(), Some("secret"));
        assert_eq!(
            rain.monitored_conditions.as_deref(),
            Some(&["rainfall".to_string(), "digest".to_string()][..])
        );
        assert_eq!(rain.coordinates(&config.home), (35.0, 135.7));

        assert_eq!(config.sensors[1].platform, Platform::Sample);
        assert!(config.sensors[1].monitored_conditions.is_none());
        assert_eq!(config.sensors[2].coordinates(&config.home), (34.7, 135.5));
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [api]
            enabled = false
        "#;

        let config = parse_config(toml).unwrap();
        assert!(!config.api.enabled);
        assert_eq!(config.api.port, 8123); // Default
        assert_eq!(config.home.latitude, 35.6895); // Default
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let toml = r#"
            [[sensor]]
            platform = "metno"
        "#;
        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_empty_monitored_conditions_rejected() {
        let toml = r#"
            [[sensor]]
            platform = "sample"
            monitored_conditions = []
        "#;
        let err = parse_config(toml).unwrap_err();
        assert!(format!("{:#}", err).contains("at least one entry"));
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let mut config = RainsenseConfig::default();
        config.home.latitude = 91.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidLatitude(91.0)));

        let mut config = RainsenseConfig::default();
        let mut sensor = IntegrationConfig::new(Platform::Sample);
        sensor.longitude = Some(-181.0);
        config.sensors.push(sensor);
        assert_eq!(config.validate(), Err(ConfigError::InvalidLongitude(-181.0)));
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let mut sensor = IntegrationConfig::new(Platform::YahooPrecipitation);
        sensor.api_key = Some("   ".to_string());
        assert_eq!(sensor.api_key(), None);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[sensor]]\nplatform = \"sample\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.sensors.len(), 1);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert!(config.sensors.is_empty());
    }
}
