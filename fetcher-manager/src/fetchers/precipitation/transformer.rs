use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use rainsense::entity::{format_amount, FetchResult, SensorType, SensorValue};
use serde_json::Value;

use super::api::PlaceResponse;
use super::config::SLOTS;
use super::digest::digest;

const CHART_URL: &str = "https://image-charts.com/chart?chs=100x100&cht=bvg&chd=t:";

/// Observation plus forecasts for one place.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub place: String,
    /// Local time of the observation slot
    pub observed_at: NaiveDateTime,
    /// mm/h at +0, +10, ..., +60 minutes
    pub amounts: [f64; SLOTS],
}

impl Report {
    pub fn current(&self) -> f64 {
        self.amounts[0]
    }

    pub fn forecasts(&self) -> &[f64] {
        &self.amounts[1..]
    }
}

/// Validates a raw response and extracts the first place's report.
pub fn parse_report(data: &Value) -> Result<Report> {
    let response: PlaceResponse =
        serde_json::from_value(data.clone()).context("Unexpected place weather payload")?;

    let feature = match response.feature.into_iter().next() {
        Some(feature) => feature,
        None => bail!("Place weather payload has no Feature"),
    };

    let weather = &feature.property.weather_list.weather;
    if weather.len() < SLOTS {
        bail!(
            "Expected {} weather slots, got {}",
            SLOTS,
            weather.len()
        );
    }

    let mut amounts = [0.0; SLOTS];
    for (amount, slot) in amounts.iter_mut().zip(weather) {
        *amount = slot.rainfall;
    }

    let date = weather[0].date.trim();
    let observed_at = NaiveDateTime::parse_from_str(date, "%Y%m%d%H%M")
        .with_context(|| format!("Invalid observation date: {:?}", date))?;

    Ok(Report {
        place: feature.name,
        observed_at,
        amounts,
    })
}

/// Bar chart of all seven slots.
pub fn chart_url(amounts: &[f64]) -> String {
    let series: Vec<String> = amounts.iter().map(|a| format_amount(*a)).collect();
    format!("{}{}", CHART_URL, series.join("|"))
}

/// Derives every precipitation sensor value from a report.
pub fn report_to_result(report: &Report) -> FetchResult {
    let mut result = FetchResult::new();

    for sensor_type in SensorType::ALL {
        if let Some(offset) = sensor_type.forecast_offset() {
            result.insert(sensor_type, SensorValue::Number(report.amounts[offset]));
        }
    }

    result.insert(SensorType::Msg, SensorValue::Text(report.place.clone()));
    result.insert(
        SensorType::Update,
        SensorValue::Text(report.observed_at.format("%Y年%m月%d日%H時%M分").to_string()),
    );
    result.insert(
        SensorType::Symbol,
        SensorValue::Text(chart_url(&report.amounts)),
    );
    result.insert(SensorType::Rainy, SensorValue::Flag(report.current() > 0.0));
    result.insert(
        SensorType::Digest,
        SensorValue::Text(digest(report.current(), report.forecasts())),
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(amounts: [f64; 7]) -> Value {
        let weather: Vec<Value> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| {
                json!({
                    "Type": if i == 0 { "observation" } else { "forecast" },
                    "Date": format!("2026101609{:02}", i * 10 % 60),
                    "Rainfall": a,
                })
            })
            .collect();
        json!({
            "Feature": [{
                "Name": "Kyoto",
                "Property": {"WeatherList": {"Weather": weather}}
            }]
        })
    }

    #[test]
    fn test_parse_report() {
        let report = parse_report(&payload([0.0, 0.0, 1.5, 0.0, 0.0, 0.0, 0.0])).unwrap();
        assert_eq!(report.place, "Kyoto");
        assert_eq!(report.current(), 0.0);
        assert_eq!(report.forecasts(), &[0.0, 1.5, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            report.observed_at.format("%Y-%m-%d %H:%M").to_string(),
            "2026-10-16 09:00"
        );
    }

    #[test]
    fn test_parse_report_string_rainfall() {
        let mut data = payload([0.0; 7]);
        data["Feature"][0]["Property"]["WeatherList"]["Weather"][3]["Rainfall"] = json!("0.75");
        let report = parse_report(&data).unwrap();
        assert_eq!(report.amounts[3], 0.75);
    }

    #[test]
    fn test_parse_report_missing_feature() {
        let err = parse_report(&json!({"ResultInfo": {"Count": 0}})).unwrap_err();
        assert!(err.to_string().contains("no Feature"));
    }

    #[test]
    fn test_parse_report_too_few_slots() {
        let mut data = payload([0.0; 7]);
        data["Feature"][0]["Property"]["WeatherList"]["Weather"]
            .as_array_mut()
            .unwrap()
            .truncate(3);
        let err = parse_report(&data).unwrap_err();
        assert!(err.to_string().contains("got 3"));
    }

    #[test]
    fn test_parse_report_bad_date() {
        let mut data = payload([0.0; 7]);
        data["Feature"][0]["Property"]["WeatherList"]["Weather"][0]["Date"] = json!("soon");
        assert!(parse_report(&data).is_err());
    }

    #[test]
    fn test_report_to_result() {
        let report = parse_report(&payload([0.0, 0.0, 0.0, 1.5, 0.0, 0.0, 2.0])).unwrap();
        let result = report_to_result(&report);

        assert_eq!(result.len(), 12);
        assert_eq!(result[&SensorType::Rainfall], SensorValue::Number(0.0));
        assert_eq!(result[&SensorType::Forecast30], SensorValue::Number(1.5));
        assert_eq!(result[&SensorType::Forecast60], SensorValue::Number(2.0));
        assert_eq!(result[&SensorType::Msg], SensorValue::Text("Kyoto".into()));
        assert_eq!(
            result[&SensorType::Update],
            SensorValue::Text("2026年10月16日09時00分".into())
        );
        assert_eq!(
            result[&SensorType::Symbol],
            SensorValue::Text(
                "https://image-charts.com/chart?chs=100x100&cht=bvg&chd=t:0.0|0.0|0.0|1.5|0.0|0.0|2.0"
                    .into()
            )
        );
        assert_eq!(result[&SensorType::Rainy], SensorValue::Flag(false));
        assert_eq!(
            result[&SensorType::Digest],
            SensorValue::Text("30分前後で1.5mmの雨が降る可能性があります".into())
        );
    }

    #[test]
    fn test_rainy_when_raining() {
        let report = parse_report(&payload([0.5; 7])).unwrap();
        let result = report_to_result(&report);
        assert_eq!(result[&SensorType::Rainy], SensorValue::Flag(true));
        assert!(!result.contains_key(&SensorType::Pressure));
    }
}
