// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data Sampling
//!
//! The sampling collaborator is an injected [`DataSampler`]; the engine never
//! issues queries itself. [`SampleFetcher`] wraps it with the per-attempt
//! timeout, retry with backoff, and an optional [`SampleCache`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::sample::Sample;
use crate::core::error::{RetryConfig, ValidatorError, ValidatorResult};

/// Fetches up to `row_limit` rows of an entity's processed output
#[async_trait]
pub trait DataSampler: Send + Sync {
    async fn sample(&self, entity: &str, row_limit: usize) -> ValidatorResult<Sample>;
}

/// Cache of samples keyed by `(entity, row_limit)`
pub trait SampleCache: Send + Sync {
    fn get(&self, entity: &str, row_limit: usize) -> Option<Arc<Sample>>;
    fn put(&self, entity: &str, row_limit: usize, sample: Arc<Sample>);
    fn invalidate(&self, entity: &str);
    fn clear(&self);
}

/// In-memory cache with an explicit TTL check on read
pub struct TtlSampleCache {
    entries: DashMap<(String, usize), (Arc<Sample>, Instant)>,
    ttl: Duration,
}

impl TtlSampleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Staleness is re-checked under the shard lock; a concurrent put may have
    /// refreshed the entry since it was read
    fn evict_if_stale(&self, key: &(String, usize)) {
        self.entries
            .remove_if(key, |_, (_, stored_at)| stored_at.elapsed() >= self.ttl);
    }
}

impl SampleCache for TtlSampleCache {
    fn get(&self, entity: &str, row_limit: usize) -> Option<Arc<Sample>> {
        let key = (entity.to_string(), row_limit);
        let fresh = {
            let entry = self.entries.get(&key)?;
            let (sample, stored_at) = entry.value();
            (stored_at.elapsed() < self.ttl).then(|| Arc::clone(sample))
        };
        if fresh.is_none() {
            self.evict_if_stale(&key);
        }
        fresh
    }

    fn put(&self, entity: &str, row_limit: usize, sample: Arc<Sample>) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries
            .insert((entity.to_string(), row_limit), (sample, Instant::now()));
    }

    fn invalidate(&self, entity: &str) {
        self.entries.retain(|(name, _), _| name != entity);
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// Sampler wrapped with timeout, retry and caching
#[derive(Clone)]
pub struct SampleFetcher {
    sampler: Arc<dyn DataSampler>,
    cache: Option<Arc<dyn SampleCache>>,
    timeout: Duration,
    retry: RetryConfig,
}

impl SampleFetcher {
    pub fn new(sampler: Arc<dyn DataSampler>, timeout: Duration) -> Self {
        Self {
            sampler,
            cache: None,
            timeout,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SampleCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sample an entity, retrying retriable failures
    ///
    /// Every attempt is bounded by the timeout; a hung sampler becomes a
    /// [`ValidatorError::Timeout`].
    pub async fn fetch(&self, entity: &str, row_limit: usize) -> ValidatorResult<Arc<Sample>> {
        if let Some(sample) = self.cache.as_ref().and_then(|c| c.get(entity, row_limit)) {
            log::debug!("Sample cache hit for '{}' ({} rows)", entity, row_limit);
            return Ok(sample);
        }

        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(
                self.timeout,
                self.sampler.sample(entity, row_limit),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ValidatorError::timeout(entity, self.timeout)),
            };

            match outcome {
                Ok(sample) => {
                    let sample = Arc::new(sample);
                    if let Some(cache) = &self.cache {
                        cache.put(entity, row_limit, Arc::clone(&sample));
                    }
                    return Ok(sample);
                }
                Err(e) if e.is_retriable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.calculate_delay(attempt);
                    log::warn!(
                        "Sampling '{}' failed (attempt {}/{}), retrying in {:?}: {}",
                        entity,
                        attempt,
                        self.retry.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
