//! Schedulers that drive fetchers.

pub mod scheduler;

pub use scheduler::{CycleOutcome, FetcherScheduler, FetcherStatus, RetryPolicy, Step, FETCH_TIMEOUT};
