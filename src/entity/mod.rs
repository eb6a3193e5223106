use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

mod value;

pub use value::{format_amount, SensorValue};

/// Static sensor key known to at least one integration.
///
/// Serialized as the lowercase key used in `monitored_conditions`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Symbol,
    Rainfall,
    Forecast10,
    Forecast20,
    Forecast30,
    Forecast40,
    Forecast50,
    Forecast60,
    Msg,
    Digest,
    Update,
    Rainy,
    Num,
    Pressure,
}

impl SensorType {
    pub const ALL: [SensorType; 14] = [
        SensorType::Symbol,
        SensorType::Rainfall,
        SensorType::Forecast10,
        SensorType::Forecast20,
        SensorType::Forecast30,
        SensorType::Forecast40,
        SensorType::Forecast50,
        SensorType::Forecast60,
        SensorType::Msg,
        SensorType::Digest,
        SensorType::Update,
        SensorType::Rainy,
        SensorType::Num,
        SensorType::Pressure,
    ];

    /// Configuration key (e.g. `"forecast30"`).
    pub fn key(&self) -> &'static str {
        match self {
            SensorType::Symbol => "symbol",
            SensorType::Rainfall => "rainfall",
            SensorType::Forecast10 => "forecast10",
            SensorType::Forecast20 => "forecast20",
            SensorType::Forecast30 => "forecast30",
            SensorType::Forecast40 => "forecast40",
            SensorType::Forecast50 => "forecast50",
            SensorType::Forecast60 => "forecast60",
            SensorType::Msg => "msg",
            SensorType::Digest => "digest",
            SensorType::Update => "update",
            SensorType::Rainy => "rainy",
            SensorType::Num => "num",
            SensorType::Pressure => "pressure",
        }
    }

    /// Parse a configuration key. Unknown keys yield `None`.
    pub fn from_key(key: &str) -> Option<SensorType> {
        SensorType::ALL.iter().copied().find(|t| t.key() == key)
    }

    /// Index into the forecast series for rainfall-type sensors.
    ///
    /// `rainfall` is the current observation (0); `forecastNN` maps to NN / 10.
    pub fn forecast_offset(&self) -> Option<usize> {
        match self {
            SensorType::Rainfall => Some(0),
            SensorType::Forecast10 => Some(1),
            SensorType::Forecast20 => Some(2),
            SensorType::Forecast30 => Some(3),
            SensorType::Forecast40 => Some(4),
            SensorType::Forecast50 => Some(5),
            SensorType::Forecast60 => Some(6),
            _ => None,
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Display name and unit for one sensor type within an integration.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorSpec {
    pub sensor_type: SensorType,
    pub name: &'static str,
    pub unit: Option<&'static str>,
}

impl SensorSpec {
    pub const fn new(
        sensor_type: SensorType,
        name: &'static str,
        unit: Option<&'static str>,
    ) -> Self {
        Self {
            sensor_type,
            name,
            unit,
        }
    }
}

/// Per-integration sensor table, fixed at configuration time.
#[derive(Clone, Debug)]
pub struct SensorCatalog {
    specs: Vec<SensorSpec>,
}

impl SensorCatalog {
    pub fn new(specs: Vec<SensorSpec>) -> Self {
        Self { specs }
    }

    pub fn get(&self, sensor_type: SensorType) -> Option<&SensorSpec> {
        self.specs.iter().find(|s| s.sensor_type == sensor_type)
    }

    pub fn contains(&self, sensor_type: SensorType) -> bool {
        self.get(sensor_type).is_some()
    }

    pub fn specs(&self) -> &[SensorSpec] {
        &self.specs
    }

    /// Keys accepted by this catalog, in table order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.specs.iter().map(|s| s.sensor_type.key()).collect()
    }
}

/// Values derived from one fetch cycle, keyed by sensor type.
///
/// Rebuilt on every cycle and dropped once applied.
pub type FetchResult = HashMap<SensorType, SensorValue>;

/// Exposed sensor object consumed by the host.
///
/// Created once at setup with an unknown (`None`) state and only mutated by
/// the scheduler that owns it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SensorEntity {
    /// Host-facing identifier (e.g. `sensor.yahoo_precipitation_rainfall`)
    pub entity_id: String,

    pub sensor_type: SensorType,

    /// Friendly name: `"{client name} {display name}"`
    pub name: String,

    pub unit: Option<String>,

    pub attribution: String,

    state: Option<SensorValue>,

    last_updated: Option<DateTime<Utc>>,
}

impl SensorEntity {
    pub fn new(client_name: &str, spec: &SensorSpec, attribution: &str) -> Self {
        let name = format!("{} {}", client_name, spec.name);
        Self {
            entity_id: format!("sensor.{}", object_id(&name)),
            sensor_type: spec.sensor_type,
            name,
            unit: spec.unit.map(str::to_string),
            attribution: attribution.to_string(),
            state: None,
            last_updated: None,
        }
    }

    pub fn state(&self) -> Option<&SensorValue> {
        self.state.as_ref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Chart image for the `symbol` sensor; no picture for any other type.
    pub fn entity_picture(&self) -> Option<&str> {
        if self.sensor_type != SensorType::Symbol {
            return None;
        }
        match &self.state {
            Some(SensorValue::Text(url)) => Some(url.as_str()),
            _ => None,
        }
    }

    /// Store `value` if it differs from the held state.
    ///
    /// Returns true when the state changed and the host must be notified.
    pub fn apply(&mut self, value: Option<SensorValue>) -> bool {
        if self.state == value {
            return false;
        }
        self.state = value;
        self.last_updated = Some(Utc::now());
        true
    }
}

/// Lowercase ASCII snake_case slug of a friendly name.
///
/// Runs of other characters (including non-ASCII letters such as kana or
/// kanji) collapse to a single underscore. An empty slug becomes `unknown`.
pub fn object_id(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("unknown");
    }
    slug
}
