//! Stale-while-revalidate strategy: serve hits immediately, refresh behind
//! the caller's back.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::executor::{Admission, build_executor};
use crate::limiter::RateLimits;
use crate::retry::RetryConfig;
use crate::store::CacheStore;
use crate::strategy::lookup;
use crate::traits::{CacheStrategy, UpstreamCall};
use crate::{MimirError, Result, telemetry};

const STRATEGY: &str = "stale_while_revalidate";

/// Background-updater strategy.
///
/// A HIT returns the cached value immediately and detaches a refresh task
/// that re-executes the full pipeline and writes through on success; every
/// refresh failure is swallowed — a caller who already received a value
/// never sees an error from best-effort work. A MISS executes the pipeline
/// inline; when admission is denied, a second retry-only pipeline runs so a
/// cold cache does not starve the caller, and the write-through is detached
/// either way.
///
/// Detached tasks run on the ambient tokio runtime and outlive the
/// triggering caller; cancelling the caller aborts only the inline path.
pub struct StaleWhileRevalidate {
    store: Arc<CacheStore>,
    retry: Option<RetryConfig>,
    limits: Option<RateLimits>,
}

impl StaleWhileRevalidate {
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

    /// Detach a full-pipeline refresh for `key`.
    fn spawn_refresh(&self, key: String, call: UpstreamCall) {
        let store = Arc::clone(&self.store);
        let retry = self.retry.clone();
        let limits = self.limits.clone();
        tokio::spawn(async move {
            let backend = store.backend();
            let executor = match build_executor(
                &backend,
                retry.as_ref(),
                limits.as_ref(),
                &key,
                Admission::Enforced,
            ) {
                Ok(executor) => executor,
                Err(e) => {
                    warn!(key, error = %e, "background refresh not built");
                    refresh_outcome("dropped");
                    return;
                }
            };
            match executor.run(&call).await {
                Ok(value) => match store.set(&key, &value).await {
                    Ok(()) => refresh_outcome("ok"),
                    Err(e) => {
                        debug!(key, error = %e, "background write-through skipped");
                        refresh_outcome("dropped");
                    }
                },
                Err(e) => {
                    debug!(key, error = %e, "background refresh dropped");
                    refresh_outcome("dropped");
                }
            }
        });
    }

    /// Detach the write-through of an inline result.
    fn spawn_write_through(&self, key: String, value: String) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.set(&key, &value).await {
                debug!(key, error = %e, "detached write-through skipped");
            }
        });
    }
}

fn refresh_outcome(status: &'static str) {
    metrics::counter!(telemetry::REFRESHES_TOTAL, "status" => status).increment(1);
}

#[async_trait]
impl CacheStrategy for StaleWhileRevalidate {
    async fn fetch(&self, key: &str, call: UpstreamCall) -> Result<String> {
        if let Some(value) = lookup(&self.store, key).await? {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "strategy" => STRATEGY).increment(1);
            debug!(key, "cache hit, refreshing in background");
            self.spawn_refresh(key.to_owned(), call);
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
        let result = match executor.run(&call).await {
            Ok(value) => value,
            Err(MimirError::RateLimitExceeded { .. }) => {
                // A cold cache must still produce a value for the caller.
                debug!(key, "admission denied on cold cache, retrying without limiter");
                let fallback = build_executor(
                    &backend,
                    self.retry.as_ref(),
                    self.limits.as_ref(),
                    key,
                    Admission::Bypassed,
                )?;
                fallback.run(&call).await?
            }
            Err(e) => return Err(e),
        };

        self.spawn_write_through(key.to_owned(), result.clone());
        Ok(result)
    }
}
