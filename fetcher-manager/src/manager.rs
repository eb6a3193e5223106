//! Fetcher manager - Orchestrates integration lifecycle.
//!
//! Sets up every configured integration, registers its entities with the
//! host and starts one polling scheduler per integration.

use crate::clock::{Clock, TokioClock};
use crate::registry::{setup_integration, Integration};
use crate::runners::{FetcherScheduler, FetcherStatus};
use rainsense::config::RainsenseConfig;
use rainsense::state::EntityHost;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

type StatusMap = HashMap<String, Arc<tokio::sync::Mutex<FetcherStatus>>>;

/// Fetcher manager - Owns all integration schedulers.
///
/// # Responsibilities
/// - Set up configured integrations (one failure does not stop the rest)
/// - Register entities with the host
/// - Start a scheduler per integration
/// - Track status for all integrations
/// - Shutdown
pub struct FetcherManager {
    host: Arc<dyn EntityHost>,
    clock: Arc<dyn Clock>,
    http_client: reqwest::Client,
    /// Scheduler handles keyed by integration key
    handles: HashMap<String, JoinHandle<()>>,
    /// Status tracking per integration key
    status_map: Arc<tokio::sync::Mutex<StatusMap>>,
}

impl FetcherManager {
    /// Creates a manager publishing to `host`.
    pub fn new(host: Arc<dyn EntityHost>, http_client: reqwest::Client) -> Self {
        Self::with_clock(host, http_client, Arc::new(TokioClock))
    }

    pub fn with_clock(
        host: Arc<dyn EntityHost>,
        http_client: reqwest::Client,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            host,
            clock,
            http_client,
            handles: HashMap::new(),
            status_map: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        }
    }

    /// Returns a clone of the status map for external monitoring.
    pub fn status_map(&self) -> Arc<tokio::sync::Mutex<StatusMap>> {
        Arc::clone(&self.status_map)
    }

    /// Number of running schedulers.
    pub fn running(&self) -> usize {
        self.handles.len()
    }

    /// Sets up and starts every integration in `config`.
    ///
    /// # Returns
    /// Number of schedulers started
    pub async fn start(&mut self, config: &RainsenseConfig) -> usize {
        info!(integrations = config.sensors.len(), "Starting fetcher manager");

        if config.sensors.is_empty() {
            warn!("No integrations configured, nothing to start");
            return 0;
        }

        let mut started = 0;
        for integration_config in &config.sensors {
            // setup_integration logs its own failures
            if let Ok(integration) =
                setup_integration(integration_config, &config.home, self.http_client.clone())
            {
                self.start_integration(integration).await;
                started += 1;
            }
        }

        info!(schedulers_started = started, "Fetcher manager started");
        started
    }

    /// Registers an integration's entities and starts its scheduler.
    ///
    /// Returns the key the integration is tracked under.
    pub async fn start_integration(&mut self, mut integration: Integration) -> String {
        let key = self.unique_key(&format!(
            "{}:{}",
            integration.fetcher.name(),
            integration.name
        ));

        // The host may rename entities whose IDs are taken
        self.host.add_entities(&mut integration.entities);

        let scheduler = FetcherScheduler::new(
            integration.fetcher,
            integration.entities,
            Arc::clone(&self.host),
            Arc::clone(&self.clock),
        );

        let status_handle = scheduler.status();
        let handle = scheduler.start();

        self.handles.insert(key.clone(), handle);
        self.status_map.lock().await.insert(key.clone(), status_handle);

        info!(key = %key, "Integration scheduler started");
        key
    }

    /// Integrations share nothing, so two blocks with the same platform and
    /// name get distinct keys.
    fn unique_key(&self, base: &str) -> String {
        if !self.handles.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}#{}", base, n))
            .find(|key| !self.handles.contains_key(key))
            .unwrap_or_else(|| base.to_string())
    }

    /// Aborts all scheduler tasks.
    pub async fn shutdown(&mut self) {
        info!("Shutting down fetcher manager");

        let count = self.handles.len();
        if count > 0 {
            info!(scheduler_count = count, "Aborting scheduler tasks");
            for (_, handle) in self.handles.drain() {
                handle.abort();
            }
        }

        info!("All scheduler tasks aborted");
    }
}

impl Drop for FetcherManager {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rainsense::config::{IntegrationConfig, Platform};
    use rainsense::state::StateStore;
    use std::time::Duration;

    fn config_with(sensors: Vec<IntegrationConfig>) -> RainsenseConfig {
        RainsenseConfig {
            sensors,
            ..RainsenseConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_without_integrations() {
        let store = Arc::new(StateStore::new());
        let mut manager = FetcherManager::new(store, reqwest::Client::new());

        assert_eq!(manager.start(&RainsenseConfig::default()).await, 0);
        assert_eq!(manager.running(), 0);
    }

    #[tokio::test]
    async fn test_failed_setup_does_not_stop_others() {
        let store = Arc::new(StateStore::new());
        let mut manager = FetcherManager::new(Arc::clone(&store) as Arc<dyn EntityHost>, reqwest::Client::new());

        // Precipitation without an API key fails setup
        let config = config_with(vec![
            IntegrationConfig::new(Platform::YahooPrecipitation),
            IntegrationConfig::new(Platform::Sample),
        ]);

        assert_eq!(manager.start(&config).await, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get_entity("sensor.sensor_base_number").is_some());

        let status_map = manager.status_map();
        assert!(status_map.lock().await.contains_key("sample:Sensor Base"));

        manager.shutdown().await;
        assert_eq!(manager.running(), 0);
    }

    #[tokio::test]
    async fn test_sample_integration_publishes_state() {
        let store = Arc::new(StateStore::new());
        let mut updates = store.subscribe();
        let mut manager = FetcherManager::new(Arc::clone(&store) as Arc<dyn EntityHost>, reqwest::Client::new());

        let mut sample = IntegrationConfig::new(Platform::Sample);
        sample.monitored_conditions = Some(vec!["num".to_string(), "msg".to_string()]);
        manager.start(&config_with(vec![sample])).await;

        // First fetch runs immediately
        let first = tokio::time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(first.old_state.is_none());
        assert!(first.new_state.is_some());

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_integrations_get_distinct_keys() {
        let store = Arc::new(StateStore::new());
        let mut manager = FetcherManager::new(store, reqwest::Client::new());

        let config = config_with(vec![
            IntegrationConfig::new(Platform::JrWest),
            IntegrationConfig::new(Platform::JrWest),
        ]);
        assert_eq!(manager.start(&config).await, 2);

        let status_map = manager.status_map();
        let status_map = status_map.lock().await;
        assert!(status_map.contains_key("jr_west:JR West"));
        assert!(status_map.contains_key("jr_west:JR West#2"));
    }

    #[tokio::test]
    async fn test_duplicate_integrations_register_distinct_entities() {
        let store = Arc::new(StateStore::new());
        let mut updates = store.subscribe();
        let mut manager = FetcherManager::new(Arc::clone(&store) as Arc<dyn EntityHost>, reqwest::Client::new());

        let config = config_with(vec![
            IntegrationConfig::new(Platform::JrWest),
            IntegrationConfig::new(Platform::JrWest),
        ]);
        assert_eq!(manager.start(&config).await, 2);

        assert_eq!(store.len(), 2);
        assert!(store.get_entity("sensor.jr_west_pressure").is_some());
        assert!(store.get_entity("sensor.jr_west_pressure_2").is_some());

        // Each scheduler publishes to its own entity
        let mut published = std::collections::HashSet::new();
        while published.len() < 2 {
            let update = tokio::time::timeout(Duration::from_secs(5), updates.recv())
                .await
                .unwrap()
                .unwrap();
            published.insert(update.entity_id);
        }
        assert!(published.contains("sensor.jr_west_pressure"));
        assert!(published.contains("sensor.jr_west_pressure_2"));

        manager.shutdown().await;
    }
}
