// Sensor data model
pub mod entity;

// Host-side entity registry and state propagation
pub mod state;

// TOML configuration
pub mod config;

// Read-only HTTP query API
pub mod api;
