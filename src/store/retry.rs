//! Timeout, retry and concurrency limits around a store
//!
//! [`RetryingStore`] wraps any store. Each call is bounded by a timeout and
//! holds one permit of a shared semaphore while in flight. Retryable
//! failures are retried with exponential backoff and jitter; once retries
//! are exhausted the last error is returned unchanged.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use log::{error, warn};
use rand::Rng;
use tokio::sync::Semaphore;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::Prediction;
use crate::store::{GroupRow, GroupedSumQuery, PredictionStore, RecordStore, StoreFuture};

/// Timeout and backoff settings for store calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on a single attempt
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for RetryPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            timeout: config.store_timeout,
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            max_delay: config.retry_max_delay,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based)
    ///
    /// Doubles per attempt up to `max_delay`, plus up to 50% random jitter.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = u64::try_from(delay.as_millis() / 2).unwrap_or(u64::MAX);
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        delay + Duration::from_millis(jitter)
    }
}

/// A store decorated with timeouts, retries and a concurrency limit
#[derive(Debug, Clone)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl<S> RetryingStore<S> {
    #[must_use]
    pub fn new(inner: S, policy: RetryPolicy, max_concurrent: usize) -> Self {
        Self {
            inner,
            policy,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Wrap `inner` with the limits of an engine configuration
    #[must_use]
    pub fn from_config(inner: S, config: &EngineConfig) -> Self {
        Self::new(inner, RetryPolicy::from(config), config.max_concurrent_queries)
    }

    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn run<'a, T, F>(&'a self, operation: &'static str, mut call: F) -> Result<T>
    where
        T: Send,
        F: FnMut() -> StoreFuture<'a, T> + Send,
    {
        let mut attempt = 0;
        loop {
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| Error::StoreUnavailable("store permits closed".into()))?;
            let outcome = match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(self.policy.timeout)),
            };
            drop(permit);

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "Store {operation} failed (attempt {}): {e}; retrying in {delay:?}",
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!(
                            "Store {operation} failed after {} attempts: {e}",
                            attempt + 1
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl<S: RecordStore> RecordStore for RetryingStore<S> {
    fn grouped_sum<'a>(&'a self, query: &'a GroupedSumQuery) -> StoreFuture<'a, Vec<GroupRow>> {
        Box::pin(self.run("grouped_sum", move || self.inner.grouped_sum(query)))
    }

    fn latest_record_date<'a>(&'a self, region_id: &'a str) -> StoreFuture<'a, Option<NaiveDate>> {
        Box::pin(self.run("latest_record_date", move || {
            self.inner.latest_record_date(region_id)
        }))
    }
}

impl<S: PredictionStore> PredictionStore for RetryingStore<S> {
    fn current_prediction<'a>(
        &'a self,
        region_id: &'a str,
        date: NaiveDate,
    ) -> StoreFuture<'a, Option<Prediction>> {
        Box::pin(self.run("current_prediction", move || {
            self.inner.current_prediction(region_id, date)
        }))
    }

    fn current_predictions_under<'a>(
        &'a self,
        parent_id: &'a str,
        date: NaiveDate,
    ) -> StoreFuture<'a, Vec<Prediction>> {
        Box::pin(self.run("current_predictions_under", move || {
            self.inner.current_predictions_under(parent_id, date)
        }))
    }
}
