pub mod api;
pub mod config;
pub mod digest;
pub mod transformer;

use crate::Fetcher;
use anyhow::Result;
use async_trait::async_trait;
use rainsense::entity::{FetchResult, SensorCatalog};
use serde_json::Value;
use std::time::Duration;

use self::api::PrecipitationClient;
use self::config::{ATTRIBUTION, POLL_INTERVAL};
use self::transformer::{parse_report, report_to_result};

/// Precipitation fetcher: polls the place-weather API for one location and
/// derives rainfall, forecasts, and a digest.
pub struct PrecipitationFetcher {
    client: PrecipitationClient,
    catalog: SensorCatalog,
}

impl PrecipitationFetcher {
    /// Create a fetcher for the production endpoint.
    pub fn new(http_client: reqwest::Client, app_id: String, latitude: f64, longitude: f64) -> Self {
        Self::with_client(PrecipitationClient::new(
            http_client,
            app_id,
            latitude,
            longitude,
        ))
    }

    /// Create a fetcher around a preconfigured client (for testing).
    pub fn with_client(client: PrecipitationClient) -> Self {
        Self {
            client,
            catalog: config::catalog(),
        }
    }
}

#[async_trait]
impl Fetcher for PrecipitationFetcher {
    fn name(&self) -> &str {
        "yahoo_precipitation"
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
        self.client.fetch_report().await
    }

    fn derive(&self, data: &Value) -> Result<FetchResult> {
        let report = parse_report(data)?;
        Ok(report_to_result(&report))
    }
}
