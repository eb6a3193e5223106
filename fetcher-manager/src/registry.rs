//! Integration registry - Maps configured platforms to fetchers and entities.

use crate::fetchers::precipitation::{self, PrecipitationFetcher};
use crate::fetchers::pressure::{self, PressureFetcher};
use crate::fetchers::sample::{self, SampleFetcher};
use crate::Fetcher;
use rainsense::config::{HomeConfig, IntegrationConfig, Platform};
use rainsense::entity::{SensorEntity, SensorType};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One configured integration: a fetcher plus the entities it feeds.
pub struct Integration {
    /// Client name prefixed to every entity name
    pub name: String,
    pub fetcher: Arc<dyn Fetcher>,
    pub entities: Vec<SensorEntity>,
}

/// Reasons an integration is not set up. None of them are retried.
#[derive(Debug, Clone, PartialEq)]
pub enum SetupError {
    /// Live platform configured without an API key
    MissingApiKey(Platform),
    /// Monitored condition not in the platform's sensor table
    UnknownCondition { platform: Platform, key: String },
    /// Monitored conditions configured as an empty list
    EmptyConditions(Platform),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::MissingApiKey(platform) => {
                write!(f, "{}: api_key is required", platform)
            }
            SetupError::UnknownCondition { platform, key } => {
                write!(f, "{}: unknown monitored condition '{}'", platform, key)
            }
            SetupError::EmptyConditions(platform) => {
                write!(f, "{}: monitored_conditions needs at least one entry", platform)
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// Default client name for a platform.
pub fn default_name(platform: Platform) -> &'static str {
    match platform {
        Platform::YahooPrecipitation => precipitation::config::DEFAULT_NAME,
        Platform::Sample => sample::DEFAULT_NAME,
        Platform::JrWest => pressure::DEFAULT_NAME,
    }
}

/// Default monitored conditions for a platform.
pub fn default_conditions(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::YahooPrecipitation => precipitation::config::DEFAULT_CONDITIONS,
        Platform::Sample => sample::DEFAULT_CONDITIONS,
        Platform::JrWest => pressure::DEFAULT_CONDITIONS,
    }
}

/// Builds the fetcher for a configured platform.
///
/// The HTTP client is shared by every live fetcher.
pub fn build_fetcher(
    config: &IntegrationConfig,
    home: &HomeConfig,
    http_client: reqwest::Client,
) -> Result<Arc<dyn Fetcher>, SetupError> {
    let fetcher: Arc<dyn Fetcher> = match config.platform {
        Platform::YahooPrecipitation => {
            let api_key = config
                .api_key()
                .ok_or(SetupError::MissingApiKey(config.platform))?;
            let (latitude, longitude) = config.coordinates(home);
            Arc::new(PrecipitationFetcher::new(
                http_client,
                api_key.to_string(),
                latitude,
                longitude,
            ))
        }
        Platform::Sample => Arc::new(SampleFetcher::new()),
        Platform::JrWest => Arc::new(PressureFetcher::new()),
    };
    Ok(fetcher)
}

/// Creates one entity per monitored condition, in configured order.
///
/// Duplicate conditions are skipped with a warning.
pub fn create_entities(
    config: &IntegrationConfig,
    fetcher: &dyn Fetcher,
) -> Result<Vec<SensorEntity>, SetupError> {
    let platform = config.platform;
    let client_name = config
        .name
        .as_deref()
        .unwrap_or_else(|| default_name(platform));

    let conditions: Vec<&str> = match &config.monitored_conditions {
        Some(list) => list.iter().map(String::as_str).collect(),
        None => default_conditions(platform).to_vec(),
    };
    if conditions.is_empty() {
        return Err(SetupError::EmptyConditions(platform));
    }

    let catalog = fetcher.catalog();
    let mut seen: Vec<SensorType> = Vec::new();
    let mut entities = Vec::with_capacity(conditions.len());

    for key in conditions {
        let spec = SensorType::from_key(key)
            .and_then(|sensor_type| catalog.get(sensor_type))
            .ok_or_else(|| SetupError::UnknownCondition {
                platform,
                key: key.to_string(),
            })?;

        if seen.contains(&spec.sensor_type) {
            warn!(integration = %platform, condition = %key, "Ignoring duplicate monitored condition");
            continue;
        }
        seen.push(spec.sensor_type);
        entities.push(SensorEntity::new(client_name, spec, fetcher.attribution()));
    }

    Ok(entities)
}

/// Sets up one configured integration.
///
/// Failures are logged here; the caller only decides whether to go on.
pub fn setup_integration(
    config: &IntegrationConfig,
    home: &HomeConfig,
    http_client: reqwest::Client,
) -> Result<Integration, SetupError> {
    let result = build_fetcher(config, home, http_client).and_then(|fetcher| {
        let entities = create_entities(config, fetcher.as_ref())?;
        Ok((fetcher, entities))
    });

    match result {
        Ok((fetcher, entities)) => {
            let name = config
                .name
                .clone()
                .unwrap_or_else(|| default_name(config.platform).to_string());
            info!(
                integration = %config.platform,
                name = %name,
                entities = entities.len(),
                "Integration set up"
            );
            Ok(Integration {
                name,
                fetcher,
                entities,
            })
        }
        Err(e) => {
            error!(integration = %config.platform, error = %e, "Integration setup failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(keys: &[&str]) -> Option<Vec<String>> {
        Some(keys.iter().map(|k| k.to_string()).collect())
    }

    fn precipitation_config() -> IntegrationConfig {
        let mut config = IntegrationConfig::new(Platform::YahooPrecipitation);
        config.api_key = Some("app-id".to_string());
        config
    }

    #[test]
    fn test_missing_api_key() {
        let config = IntegrationConfig::new(Platform::YahooPrecipitation);
        let result = setup_integration(&config, &HomeConfig::default(), reqwest::Client::new());
        assert_eq!(
            result.err(),
            Some(SetupError::MissingApiKey(Platform::YahooPrecipitation))
        );
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let mut config = IntegrationConfig::new(Platform::YahooPrecipitation);
        config.api_key = Some("  ".to_string());
        let result = setup_integration(&config, &HomeConfig::default(), reqwest::Client::new());
        assert!(matches!(result, Err(SetupError::MissingApiKey(_))));
    }

    #[test]
    fn test_stubs_need_no_api_key() {
        for platform in [Platform::Sample, Platform::JrWest] {
            let config = IntegrationConfig::new(platform);
            assert!(setup_integration(&config, &HomeConfig::default(), reqwest::Client::new()).is_ok());
        }
    }

    #[test]
    fn test_default_conditions() {
        let integration =
            setup_integration(&precipitation_config(), &HomeConfig::default(), reqwest::Client::new())
                .unwrap();
        assert_eq!(integration.name, "Yahoo Precipitation");
        assert_eq!(integration.entities.len(), 1);
        assert_eq!(
            integration.entities[0].entity_id,
            "sensor.yahoo_precipitation_rainfall"
        );

        let sample = setup_integration(
            &IntegrationConfig::new(Platform::Sample),
            &HomeConfig::default(),
            reqwest::Client::new(),
        )
        .unwrap();
        assert_eq!(sample.entities[0].sensor_type, SensorType::Num);
        assert_eq!(sample.entities[0].name, "Sensor Base Number");

        let jr_west = setup_integration(
            &IntegrationConfig::new(Platform::JrWest),
            &HomeConfig::default(),
            reqwest::Client::new(),
        )
        .unwrap();
        assert_eq!(jr_west.entities[0].sensor_type, SensorType::Pressure);
    }

    #[test]
    fn test_one_entity_per_condition_with_catalog_unit() {
        let mut config = precipitation_config();
        config.name = Some("Kyoto".to_string());
        config.monitored_conditions = conditions(&["rainfall", "forecast30", "digest", "rainy"]);

        let integration =
            setup_integration(&config, &HomeConfig::default(), reqwest::Client::new()).unwrap();
        assert_eq!(integration.entities.len(), 4);

        let catalog = integration.fetcher.catalog();
        for entity in &integration.entities {
            let spec = catalog.get(entity.sensor_type).unwrap();
            assert_eq!(entity.unit.as_deref(), spec.unit);
            assert!(entity.state().is_none());
            assert_eq!(entity.attribution, "(C) Yahoo Japan Corporation.");
        }
        assert_eq!(integration.entities[1].name, "Kyoto Forecast after 30 minutes");
    }

    #[test]
    fn test_unknown_condition() {
        let mut config = IntegrationConfig::new(Platform::Sample);
        config.monitored_conditions = conditions(&["num", "pressure"]);

        let result = setup_integration(&config, &HomeConfig::default(), reqwest::Client::new());
        assert_eq!(
            result.err(),
            Some(SetupError::UnknownCondition {
                platform: Platform::Sample,
                key: "pressure".to_string()
            })
        );
    }

    #[test]
    fn test_empty_conditions() {
        let mut config = IntegrationConfig::new(Platform::JrWest);
        config.monitored_conditions = Some(Vec::new());

        let result = setup_integration(&config, &HomeConfig::default(), reqwest::Client::new());
        assert_eq!(result.err(), Some(SetupError::EmptyConditions(Platform::JrWest)));
    }

    #[test]
    fn test_duplicate_conditions_are_skipped() {
        let mut config = IntegrationConfig::new(Platform::Sample);
        config.monitored_conditions = conditions(&["num", "msg", "num"]);

        let integration =
            setup_integration(&config, &HomeConfig::default(), reqwest::Client::new()).unwrap();
        assert_eq!(integration.entities.len(), 2);
    }

    #[test]
    fn test_setup_error_display() {
        assert_eq!(
            SetupError::MissingApiKey(Platform::YahooPrecipitation).to_string(),
            "yahoo_precipitation: api_key is required"
        );
    }
}
