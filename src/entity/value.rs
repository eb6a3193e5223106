use serde::{Deserialize, Serialize};
use std::fmt;

/// Current state of a sensor entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Flag(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

/// Renders the state the way the host shows it (`2.0`, `True`, ...).
impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Flag(true) => f.write_str("True"),
            SensorValue::Flag(false) => f.write_str("False"),
            SensorValue::Integer(i) => write!(f, "{}", i),
            SensorValue::Number(n) => f.write_str(&format_amount(*n)),
            SensorValue::Text(s) => f.write_str(s),
        }
    }
}

/// Formats a float keeping one decimal place for whole numbers.
///
/// `2.0 -> "2.0"`, `0.35 -> "0.35"`.
pub fn format_amount(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
