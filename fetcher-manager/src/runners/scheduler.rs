//! Per-integration polling scheduler.
//!
//! Each integration gets its own scheduler that fetches on an interval,
//! derives sensor values and pushes changed values to the host.

use crate::clock::{until_next_minute, Clock};
use crate::Fetcher;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rainsense::entity::{FetchResult, SensorEntity};
use rainsense::state::EntityHost;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Upper bound on a single `fetch()` call.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Randomized delay used after a failed cycle instead of the poll interval.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub min_minutes: u64,
    pub max_minutes: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_minutes: 3,
            max_minutes: 4,
        }
    }
}

impl RetryPolicy {
    /// Whole minutes drawn uniformly from `[min_minutes, max_minutes]`.
    pub fn next_delay(&self) -> Duration {
        let minutes = rand::thread_rng().gen_range(self.min_minutes..=self.max_minutes);
        Duration::from_secs(minutes * 60)
    }
}

/// Result of one fetch cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// Payload fetched and applied; `changed` entities were published.
    Updated { changed: usize, next: Duration },
    /// Fetch or parse failed; next attempt after `delay`.
    Retry { delay: Duration, error: String },
}

impl CycleOutcome {
    /// Delay until the next fetch.
    pub fn delay(&self) -> Duration {
        match self {
            CycleOutcome::Updated { next, .. } => *next,
            CycleOutcome::Retry { delay, .. } => *delay,
        }
    }
}

/// What one scheduler step did.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Fetched(CycleOutcome),
    /// Wall-clock refresh from the cached payload; number of entities changed.
    Refreshed(usize),
}

/// Status information for an integration.
#[derive(Clone, Debug, Default)]
pub struct FetcherStatus {
    /// Last successful fetch timestamp
    pub last_fetch: Option<DateTime<Utc>>,
    /// Last error message (if any)
    pub last_error: Option<String>,
    /// Scheduled time of the next fetch
    pub next_fetch: Option<DateTime<Utc>>,
    /// Total number of successful fetches
    pub fetch_count: u64,
    /// Total number of failed fetches
    pub error_count: u64,
}

/// Polling scheduler for a single integration.
///
/// Owns the integration's entities and the last fetched payload:
/// - Fetches immediately on start, then after the fetcher's poll interval
/// - Retries failed fetches after 3-4 minutes, indefinitely
/// - Re-derives from the cached payload every minute at second 0
/// - Publishes only the entities whose value changed, as one joined batch
pub struct FetcherScheduler {
    fetcher: Arc<dyn Fetcher>,
    entities: Vec<SensorEntity>,
    host: Arc<dyn EntityHost>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    /// Last payload that derived successfully
    data: Option<Value>,
    /// Next fetch time; `None` until the first fetch
    fetch_at: Option<DateTime<Utc>>,
    status: Arc<tokio::sync::Mutex<FetcherStatus>>,
}

impl FetcherScheduler {
    /// Creates a new scheduler for a fetcher and its entities.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        entities: Vec<SensorEntity>,
        host: Arc<dyn EntityHost>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            entities,
            host,
            clock,
            retry: RetryPolicy::default(),
            data: None,
            fetch_at: None,
            status: Arc::new(tokio::sync::Mutex::new(FetcherStatus::default())),
        }
    }

    /// Returns a clone of the status tracker for external monitoring.
    pub fn status(&self) -> Arc<tokio::sync::Mutex<FetcherStatus>> {
        Arc::clone(&self.status)
    }

    pub fn entities(&self) -> &[SensorEntity] {
        &self.entities
    }

    /// Starts the polling loop (non-blocking).
    ///
    /// Spawns a background task that runs until aborted.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        let integration = self.fetcher.name().to_string();
        let interval_secs = self.fetcher.poll_interval().as_secs();

        tokio::spawn(async move {
            info!(
                integration = %integration,
                interval_secs = interval_secs,
                entities = self.entities.len(),
                "Starting fetcher scheduler"
            );

            let mut scheduler = self;
            loop {
                scheduler.step().await;
            }
        })
    }

    /// Waits for the next timer and runs it.
    ///
    /// Fetches when the fetch deadline comes first (or has never run),
    /// otherwise sleeps to the next minute boundary and refreshes.
    pub async fn step(&mut self) -> Step {
        let now = self.clock.now();
        let until_tick = until_next_minute(now);

        let until_fetch = match self.fetch_at {
            None => Duration::ZERO,
            Some(at) => (at - now).to_std().unwrap_or(Duration::ZERO),
        };

        if until_fetch <= until_tick {
            if !until_fetch.is_zero() {
                self.clock.sleep(until_fetch).await;
            }
            let outcome = self.run_cycle().await;
            Step::Fetched(outcome)
        } else {
            self.clock.sleep(until_tick).await;
            Step::Refreshed(self.refresh().await)
        }
    }

    /// Runs one fetch cycle: fetch, derive, apply, reschedule.
    ///
    /// Never fails; errors turn into a randomized retry delay.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        debug!(integration = %self.fetcher.name(), "Fetching");

        let fetched = match tokio::time::timeout(FETCH_TIMEOUT, self.fetcher.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "request timed out after {}s",
                FETCH_TIMEOUT.as_secs()
            )),
        };

        let derived = fetched.and_then(|data| {
            let result = self.fetcher.derive(&data)?;
            Ok((data, result))
        });

        let outcome = match derived {
            Ok((data, result)) => {
                self.data = Some(data);
                let changed = self.apply(&result).await;

                let mut status = self.status.lock().await;
                status.last_fetch = Some(self.clock.now());
                status.last_error = None;
                status.fetch_count += 1;

                CycleOutcome::Updated {
                    changed,
                    next: self.fetcher.poll_interval(),
                }
            }
            Err(e) => {
                let delay = self.retry.next_delay();
                error!(
                    integration = %self.fetcher.name(),
                    error = %format!("{:#}", e),
                    "Retrying in {} minutes",
                    delay.as_secs() / 60
                );

                let mut status = self.status.lock().await;
                status.last_error = Some(format!("{:#}", e));
                status.error_count += 1;

                CycleOutcome::Retry {
                    delay,
                    error: format!("{:#}", e),
                }
            }
        };

        let next = self.clock.now()
            + chrono::Duration::from_std(outcome.delay()).unwrap_or_else(|_| chrono::Duration::zero());
        self.fetch_at = Some(next);
        self.status.lock().await.next_fetch = Some(next);

        outcome
    }

    /// Re-derives values from the cached payload without a network call.
    ///
    /// No-op until a fetch has succeeded.
    pub async fn refresh(&mut self) -> usize {
        let derived = match &self.data {
            None => return 0,
            Some(data) => self.fetcher.derive(data),
        };

        match derived {
            Ok(result) => self.apply(&result).await,
            Err(e) => {
                warn!(
                    integration = %self.fetcher.name(),
                    error = %e,
                    "Failed to derive values from cached payload"
                );
                0
            }
        }
    }

    /// Applies derived values and publishes the changed entities.
    ///
    /// Types missing from `result` become unknown. Returns the number of
    /// entities whose state changed.
    async fn apply(&mut self, result: &FetchResult) -> usize {
        let mut changed = Vec::new();
        for entity in &mut self.entities {
            let new_state = result.get(&entity.sensor_type).cloned();
            if entity.apply(new_state) {
                changed.push(entity.clone());
            }
        }

        if changed.is_empty() {
            debug!(integration = %self.fetcher.name(), "No state changes");
            return 0;
        }

        let host = Arc::clone(&self.host);
        let results = join_all(changed.iter().map(|entity| host.update_state(entity))).await;

        for (entity, result) in changed.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    integration = %self.fetcher.name(),
                    entity_id = %entity.entity_id,
                    error = %e,
                    "Failed to publish state"
                );
            }
        }

        debug!(
            integration = %self.fetcher.name(),
            changed = changed.len(),
            "Published state changes"
        );

        changed.len()
    }
}
