use anyhow::{anyhow, Context, Result};
use rainsense::entity::format_amount;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::config::BASE_URL;

/// Body of a place-weather response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaceResponse {
    #[serde(default)]
    pub feature: Vec<Feature>,
}

/// One requested location.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Feature {
    pub name: String,
    pub property: Property,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Property {
    pub weather_list: WeatherList,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherList {
    #[serde(default)]
    pub weather: Vec<Weather>,
}

/// One 10-minute slot: index 0 is the observation, 1..=6 the forecasts.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Weather {
    /// `YYYYMMDDHHmm`, local time
    pub date: String,
    /// mm/h; the API sends either a number or a numeric string
    #[serde(deserialize_with = "deserialize_amount")]
    pub rainfall: f64,
}

fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid rainfall amount: {:?}", s))),
    }
}

/// HTTP client for the place-weather endpoint.
///
/// Borrows a shared `reqwest::Client`; one GET per call.
pub struct PrecipitationClient {
    http_client: Client,
    base_url: String,
    app_id: String,
    coordinates: String,
}

impl PrecipitationClient {
    /// Create a client for the production endpoint.
    pub fn new(http_client: Client, app_id: String, latitude: f64, longitude: f64) -> Self {
        Self::with_base_url(http_client, BASE_URL.to_string(), app_id, latitude, longitude)
    }

    /// Create a client with a custom endpoint URL (for testing with a mock server).
    pub fn with_base_url(
        http_client: Client,
        base_url: String,
        app_id: String,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            http_client,
            base_url,
            app_id,
            // The API takes longitude first
            coordinates: format!("{},{}", format_amount(longitude), format_amount(latitude)),
        }
    }

    pub fn coordinates(&self) -> &str {
        &self.coordinates
    }

    /// Fetch the current report as raw JSON.
    pub async fn fetch_report(&self) -> Result<Value> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("coordinates", self.coordinates.as_str()),
                ("output", "json"),
                ("appid", self.app_id.as_str()),
            ])
            .send()
            .await
            .context("Failed to send place weather request")?;

        check_response_status(&response)?;
        response
            .json::<Value>()
            .await
            .context("Failed to parse place weather response")
    }
}

/// Map non-success HTTP status codes to descriptive errors.
fn check_response_status(response: &reqwest::Response) -> Result<()> {
    match response.status() {
        StatusCode::OK => Ok(()),
        StatusCode::BAD_REQUEST => Err(anyhow!("Bad request (400): check coordinates")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(anyhow!(
            "Access denied ({}): check the application id",
            response.status().as_u16()
        )),
        StatusCode::TOO_MANY_REQUESTS => Err(anyhow!("Rate limit exceeded (429)")),
        status => Err(anyhow!("Unexpected status: {}", status)),
    }
}
