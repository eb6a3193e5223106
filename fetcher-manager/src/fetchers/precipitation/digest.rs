//! Natural-language summary of near-term rain onset or cessation.
//!
//! Horizons are scanned nearest first; the first qualifying one wins.

use rainsense::entity::format_amount;

/// Labels for forecast horizons 1..=6 (10 minutes apart).
const HORIZON_LABELS: [&str; 6] = ["10分", "20分", "30分", "40分", "50分", "1時間"];

pub const NO_RAIN_EXPECTED: &str = "一時間以内に雨が降る予報はありません";
pub const RAIN_CONTINUES: &str = "雨が降っています。一時間以内に止む予報はありません";

/// Builds the digest from the current amount and the six forecasts.
pub fn digest(current: f64, forecasts: &[f64]) -> String {
    let horizons = HORIZON_LABELS.iter().zip(forecasts);

    if current == 0.0 {
        horizons
            .filter(|(_, amount)| **amount != 0.0)
            .map(|(label, amount)| {
                format!(
                    "{}前後で{}mmの雨が降る可能性があります",
                    label,
                    format_amount(*amount)
                )
            })
            .next()
            .unwrap_or_else(|| NO_RAIN_EXPECTED.to_string())
    } else {
        horizons
            .filter(|(_, amount)| **amount == 0.0)
            .map(|(label, _)| format!("{}前後で雨が止む可能性があります", label))
            .next()
            .unwrap_or_else(|| RAIN_CONTINUES.to_string())
    }
}
