//! Bounded-freshness strategy: cache-aside with TTL.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::executor::{Admission, build_executor};
use crate::limiter::RateLimits;
use crate::retry::RetryConfig;
use crate::store::CacheStore;
use crate::strategy::lookup;
use crate::traits::{CacheStrategy, UpstreamCall};
use crate::{MimirError, Result, telemetry};

const STRATEGY: &str = "bounded_freshness";

/// Cache-aside with TTL-bounded freshness.
///
/// Freshness is governed entirely by the store's write options (TTL on the
/// entry); a present entry is fresh by definition. On miss the full
/// pipeline runs inline and the write-through is awaited, so a caller that
/// returns has either hit the cache or populated it.
pub struct BoundedFreshness {
    store: Arc<CacheStore>,
    retry: Option<RetryConfig>,
    limits: Option<RateLimits>,
}

impl BoundedFreshness {
    /// Create the strategy with neither retry nor admission control.
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            retry: None,
            limits: None,
        }
    }

    /// Wrap upstream calls with a retry policy.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Guard upstream calls with sliding-window admission control.
    pub fn rate_limits(mut self, limits: RateLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}

#[async_trait]
impl CacheStrategy for BoundedFreshness {
    async fn fetch(&self, key: &str, call: UpstreamCall) -> Result<String> {
        if let Some(value) = lookup(&self.store, key).await? {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "strategy" => STRATEGY).increment(1);
            debug!(key, "cache hit");
            return Ok(value);
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "strategy" => STRATEGY).increment(1);

        let backend = self.store.backend();
        let executor = build_executor(
            &backend,
            self.retry.as_ref(),
            self.limits.as_ref(),
            key,
            Admission::Enforced,
        )?;
        let result = executor.run(&call).await?;

        match self.store.set(key, &result).await {
            Ok(()) => {}
            Err(MimirError::NonCacheableValue) => {
                debug!(key, "write-through skipped by filter");
            }
            Err(e) => return Err(e),
        }
        Ok(result)
    }
}
