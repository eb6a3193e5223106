//! Built-in integrations.

pub mod precipitation;
pub mod pressure;
pub mod sample;
