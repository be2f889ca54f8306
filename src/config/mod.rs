//! Engine and tenant configuration

use std::time::Duration;

use log::warn;

pub mod tenant;

pub use tenant::{TenantConfig, TenantRegistry};

/// Environment variable overriding the per-call store timeout, in milliseconds
pub const STORE_TIMEOUT_ENV: &str = "EPI_STORE_TIMEOUT_MS";
/// Environment variable overriding the number of store retries
pub const MAX_RETRIES_ENV: &str = "EPI_MAX_RETRIES";
/// Environment variable overriding the first retry delay, in milliseconds
pub const RETRY_BASE_DELAY_ENV: &str = "EPI_RETRY_BASE_DELAY_MS";
/// Environment variable overriding the store concurrency limit
pub const MAX_CONCURRENT_QUERIES_ENV: &str = "EPI_MAX_CONCURRENT_QUERIES";

/// Configuration for the aggregation engine and its store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on a single store call
    pub store_timeout: Duration,
    /// Retries of a retryable store failure before giving up
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt
    pub retry_base_delay: Duration,
    /// Cap on the retry delay
    pub retry_max_delay: Duration,
    /// Store calls allowed in flight at once
    pub max_concurrent_queries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(50),
            retry_max_delay: Duration::from_secs(2),
            max_concurrent_queries: num_cpus::get(),
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by any `EPI_*` environment variables that are set
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by variable name
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_var::<u64>(&lookup, STORE_TIMEOUT_ENV) {
            self.store_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var::<u32>(&lookup, MAX_RETRIES_ENV) {
            self.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, RETRY_BASE_DELAY_ENV) {
            self.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(limit) = parse_var::<usize>(&lookup, MAX_CONCURRENT_QUERIES_ENV) {
            self.max_concurrent_queries = limit.max(1);
        }
        self
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value '{raw}' for {name}");
            None
        }
    }
}
