use anyhow::Result;
use async_trait::async_trait;
use rainsense::entity::{FetchResult, SensorCatalog};
use serde_json::Value;
use std::time::Duration;

/// Data source behind one integration.
///
/// Fetchers are stateless: the scheduler owns the entities, caches the last
/// payload and decides when to call `fetch` again.
///
/// # Lifecycle
/// 1. Setup builds the fetcher and one entity per monitored condition
/// 2. Scheduler calls `fetch()` (bounded by a 10 second timeout)
/// 3. Scheduler calls `derive()` on the payload and applies the result
/// 4. Next fetch after `poll_interval()`, or after a short randomized
///    delay when steps 2-3 failed
///
/// # Example
/// ```no_run
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use fetcher_manager::Fetcher;
/// use rainsense::entity::{FetchResult, SensorCatalog, SensorSpec, SensorType, SensorValue};
/// use serde_json::{json, Value};
/// use std::time::Duration;
///
/// struct Constant {
///     catalog: SensorCatalog,
/// }
///
/// #[async_trait]
/// impl Fetcher for Constant {
///     fn name(&self) -> &str {
///         "constant"
///     }
///
///     fn catalog(&self) -> &SensorCatalog {
///         &self.catalog
///     }
///
///     fn attribution(&self) -> &str {
///         "local"
///     }
///
///     fn poll_interval(&self) -> Duration {
///         Duration::from_secs(60)
///     }
///
///     async fn fetch(&self) -> Result<Value> {
///         Ok(json!({ "value": 42 }))
///     }
///
///     fn derive(&self, data: &Value) -> Result<FetchResult> {
///         let mut result = FetchResult::new();
///         let value = data["value"].as_i64().unwrap_or_default();
///         result.insert(SensorType::Num, SensorValue::Integer(value));
///         Ok(result)
///     }
/// }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Platform key used in configuration and logs (e.g. "yahoo_precipitation").
    fn name(&self) -> &str;

    /// Sensor types this integration can expose.
    fn catalog(&self) -> &SensorCatalog;

    /// Attribution attribute attached to every entity.
    fn attribution(&self) -> &str;

    /// Delay before the next fetch after a successful cycle.
    fn poll_interval(&self) -> Duration;

    /// Performs one network call (or synthesizes data) and returns the
    /// parsed JSON payload.
    ///
    /// Transport errors, non-success statuses and unparsable bodies are
    /// all errors; the scheduler retries them uniformly.
    async fn fetch(&self) -> Result<Value>;

    /// Maps a payload to sensor values.
    ///
    /// Fails when the payload does not have the expected shape. Called on
    /// every fetch cycle and on every wall-clock refresh tick.
    fn derive(&self, data: &Value) -> Result<FetchResult>;
}
