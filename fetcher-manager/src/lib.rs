//! Rainsense fetcher manager - Polling integrations that feed sensor entities.
//!
//! Each configured integration pairs a [`Fetcher`] with the entities it
//! feeds. A scheduler per integration fetches on an interval, derives sensor
//! values and publishes only the changed ones to the host.
//!
//! # Architecture
//!
//! ```text
//! Weather API / local synthesis
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Fetcher (implements trait)         │
//! │  - Fetch one JSON payload                │
//! │  - Derive sensor values from it          │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Fetcher Scheduler                  │
//! │  - Poll interval / randomized retry      │
//! │  - Minute refresh from cached payload    │
//! │  - Publish changed entities              │
//! └─────────────────────────────────────────┘
//!          ↓
//!    EntityHost (state store)
//! ```
//!
//! # Core Types
//!
//! - [`Fetcher`] - Trait that all integrations implement
//! - [`FetcherScheduler`] - Per-integration polling loop
//! - [`FetcherManager`] - Starts and stops schedulers from configuration
//! - [`Clock`] - Time source, replaceable in tests

pub mod clock;
mod fetcher;
pub mod fetchers;
pub mod manager;
pub mod registry;
pub mod runners;

pub use clock::{Clock, TokioClock, VirtualClock};
pub use fetcher::Fetcher;
pub use manager::FetcherManager;
pub use registry::{setup_integration, Integration, SetupError};
pub use runners::{CycleOutcome, FetcherScheduler, FetcherStatus};
