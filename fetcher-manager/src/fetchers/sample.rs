use crate::Fetcher;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rainsense::entity::{FetchResult, SensorCatalog, SensorSpec, SensorType, SensorValue};
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_NAME: &str = "Sensor Base";
pub const ATTRIBUTION: &str = "開発ツール > Status などに表示される帰属";
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_CONDITIONS: &[&str] = &["num"];

/// Synthetic integration: every fetch draws a number in `[0, 50]`.
pub struct SampleFetcher {
    catalog: SensorCatalog,
}

impl SampleFetcher {
    pub fn new() -> Self {
        Self {
            catalog: SensorCatalog::new(vec![
                SensorSpec::new(SensorType::Num, "Number", Some("num")),
                SensorSpec::new(SensorType::Msg, "String", None),
            ]),
        }
    }
}

impl Default for SampleFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for SampleFetcher {
    fn name(&self) -> &str {
        "sample"
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
        let n: i64 = rand::thread_rng().gen_range(0..=50);
        Ok(json!({ "num": n }))
    }

    fn derive(&self, data: &Value) -> Result<FetchResult> {
        let n = data["num"]
            .as_i64()
            .ok_or_else(|| anyhow!("Sample payload has no integer \"num\""))?;

        let mut result = FetchResult::new();
        result.insert(SensorType::Num, SensorValue::Integer(n));
        result.insert(SensorType::Msg, SensorValue::Text(format!("Message {}", n)));
        Ok(result)
    }
}
