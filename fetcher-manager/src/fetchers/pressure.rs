use crate::Fetcher;
use anyhow::{bail, Result};
use async_trait::async_trait;
use rainsense::entity::{FetchResult, SensorCatalog, SensorSpec, SensorType, SensorValue};
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_NAME: &str = "JR West";
pub const ATTRIBUTION: &str =
    "Weather forecast from met.no, delivered by the Norwegian Meteorological Institute.";
pub const POLL_INTERVAL: Duration = Duration::from_secs(3600);
pub const DEFAULT_CONDITIONS: &[&str] = &["pressure"];

const MARKER: &str = "hoge";

/// Random pressure stub.
///
/// Fetch only produces a marker payload; every derive, including the
/// per-minute refresh, draws a fresh value per sensor type.
pub struct PressureFetcher {
    catalog: SensorCatalog,
}

impl PressureFetcher {
    pub fn new() -> Self {
        Self {
            catalog: SensorCatalog::new(vec![
                SensorSpec::new(SensorType::Pressure, "Pressure", Some("hPa")),
                SensorSpec::new(SensorType::Num, "Number", Some("num")),
            ]),
        }
    }
}

impl Default for PressureFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for PressureFetcher {
    fn name(&self) -> &str {
        "jr_west"
    }

    fn catalog(&self) -> &SensorCatalog {
        &self.catalog
    }

    fn attribution(&self) -> &str {
        ATTRIBUTION
    }

    fn poll_interval(&self) -> Duration {
        POLL_INTERVAL
    }

    async fn fetch(&self) -> Result<Value> {
        Ok(json!({ "hoge": 36 }))
    }

    fn derive(&self, data: &Value) -> Result<FetchResult> {
        if data.get(MARKER).is_none() {
            bail!("Pressure payload has no \"{}\" marker", MARKER);
        }

        let mut rng = rand::thread_rng();
        Ok(self
            .catalog
            .specs()
            .iter()
            .map(|spec| (spec.sensor_type, SensorValue::Integer(rng.gen_range(0..=50))))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_derive_values_in_range() {
        let fetcher = PressureFetcher::new();
        let data = fetcher.fetch().await.unwrap();

        for _ in 0..20 {
            let result = fetcher.derive(&data).unwrap();
            assert_eq!(result.len(), 2);
            for value in result.values() {
                match value {
                    SensorValue::Integer(n) => assert!((0..=50).contains(n)),
                    other => panic!("unexpected value {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_derive_rejects_foreign_payload() {
        let fetcher = PressureFetcher::new();
        assert!(fetcher.derive(&json!({"num": 1})).is_err());
    }

    #[test]
    fn test_metadata() {
        let fetcher = PressureFetcher::new();
        assert_eq!(fetcher.name(), "jr_west");
        assert_eq!(fetcher.poll_interval(), Duration::from_secs(3600));
        assert_eq!(
            fetcher.catalog().get(SensorType::Pressure).unwrap().unit,
            Some("hPa")
        );
    }
}
