use rainsense::entity::{SensorCatalog, SensorSpec, SensorType};
use std::time::Duration;

pub const BASE_URL: &str = "https://map.yahooapis.jp/weather/V1/place";
pub const DEFAULT_NAME: &str = "Yahoo Precipitation";
pub const ATTRIBUTION: &str = "(C) Yahoo Japan Corporation.";
pub const POLL_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_CONDITIONS: &[&str] = &["rainfall"];

/// Number of 10-minute slots in a report: observation plus six forecasts.
pub const SLOTS: usize = 7;

const SPECS: [SensorSpec; 12] = [
    SensorSpec::new(SensorType::Symbol, "Graph", None),
    SensorSpec::new(SensorType::Rainfall, "Rainfall", Some("mm")),
    SensorSpec::new(SensorType::Forecast10, "Forecast after 10 minutes", Some("mm")),
    SensorSpec::new(SensorType::Forecast20, "Forecast after 20 minutes", Some("mm")),
    SensorSpec::new(SensorType::Forecast30, "Forecast after 30 minutes", Some("mm")),
    SensorSpec::new(SensorType::Forecast40, "Forecast after 40 minutes", Some("mm")),
    SensorSpec::new(SensorType::Forecast50, "Forecast after 50 minutes", Some("mm")),
    SensorSpec::new(SensorType::Forecast60, "Forecast after 1 hour", Some("mm")),
    SensorSpec::new(SensorType::Msg, "Message", None),
    SensorSpec::new(SensorType::Digest, "Digest", None),
    SensorSpec::new(SensorType::Update, "Update", None),
    SensorSpec::new(SensorType::Rainy, "Rainy", None),
];

/// Sensor table for the precipitation integration.
pub fn catalog() -> SensorCatalog {
    SensorCatalog::new(SPECS.to_vec())
}
