//! Tests for retry behaviour as composed into the call pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use mimir::{
    BoundedFreshness, CacheStore, CacheStrategy, MemoryBackend, MimirError, RetryConfig,
    UpstreamCall,
};

/// Upstream stand-in that fails N times then succeeds.
struct FailThenSucceed {
    fail_count: AtomicU32,
    total_calls: AtomicU32,
}

impl FailThenSucceed {
    fn new(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            fail_count: AtomicU32::new(failures),
            total_calls: AtomicU32::new(0),
        })
    }

    fn call_count(&self) -> u32 {
        self.total_calls.load(Ordering::Relaxed)
    }
}

fn as_call(upstream: &Arc<FailThenSucceed>, fail_with: fn() -> MimirError) -> UpstreamCall {
    let this = Arc::clone(upstream);
    Arc::new(move || {
        let this = Arc::clone(&this);
        Box::pin(async move {
            this.total_calls.fetch_add(1, Ordering::Relaxed);
            if this.fail_count.load(Ordering::Relaxed) > 0 {
                this.fail_count.fetch_sub(1, Ordering::Relaxed);
                return Err(fail_with());
            }
            Ok("recovered".to_owned())
        })
    })
}

fn strategy_with_retry(max_attempts: u32) -> BoundedFreshness {
    let store = Arc::new(CacheStore::new(Arc::new(MemoryBackend::new())));
    BoundedFreshness::new(store).retry(
        RetryConfig::new()
            .max_attempts(max_attempts)
            .initial_delay(Duration::from_millis(1)),
    )
}

#[tokio::test]
async fn retries_on_transient_error_then_succeeds() {
    let upstream = FailThenSucceed::new(2);
    let strategy = strategy_with_retry(3);

    let result = strategy
        .fetch("k", as_call(&upstream, || MimirError::upstream_transient("timeout")))
        .await;

    assert_eq!(result.unwrap(), "recovered");
    assert_eq!(upstream.call_count(), 3); // 2 failures + 1 success
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let upstream = FailThenSucceed::new(10);
    let strategy = strategy_with_retry(3);

    let result = strategy
        .fetch("k", as_call(&upstream, || MimirError::upstream_transient("timeout")))
        .await;

    // Exhaustion surfaces the last underlying failure as-is.
    assert!(matches!(result, Err(MimirError::Upstream { .. })));
    assert_eq!(upstream.call_count(), 3);
}

#[tokio::test]
async fn does_not_retry_permanent_errors() {
    let upstream = FailThenSucceed::new(1);
    let strategy = strategy_with_retry(5);

    let result = strategy
        .fetch("k", as_call(&upstream, || MimirError::upstream_permanent("bad request")))
        .await;

    assert!(matches!(
        result,
        Err(MimirError::Upstream { transient: false, .. })
    ));
    assert_eq!(upstream.call_count(), 1);
}

#[tokio::test]
async fn upstream_rate_limit_is_transient() {
    let upstream = FailThenSucceed::new(1);
    let strategy = strategy_with_retry(3);

    let result = strategy
        .fetch(
            "k",
            as_call(&upstream, || MimirError::UpstreamRateLimited {
                retry_after: Some(Duration::from_millis(1)),
            }),
        )
        .await;

    assert_eq!(result.unwrap(), "recovered");
    assert_eq!(upstream.call_count(), 2);
}

#[tokio::test]
async fn no_retry_config_fails_immediately() {
    let upstream = FailThenSucceed::new(1);
    let store = Arc::new(CacheStore::new(Arc::new(MemoryBackend::new())));
    let strategy = BoundedFreshness::new(store);

    let result = strategy
        .fetch("k", as_call(&upstream, || MimirError::upstream_transient("timeout")))
        .await;

    assert!(result.is_err());
    assert_eq!(upstream.call_count(), 1);
}

// ============================================================================
// RetryConfig
// ============================================================================

#[test]
fn retry_config_defaults() {
    let config = RetryConfig::default();
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.initial_delay, Duration::from_millis(500));
    assert_eq!(config.max_delay, Duration::from_secs(30));
}

#[test]
fn retry_config_builder() {
    let config = RetryConfig::new()
        .max_attempts(5)
        .initial_delay(Duration::from_millis(200))
        .max_delay(Duration::from_secs(5));
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.initial_delay, Duration::from_millis(200));
    assert_eq!(config.max_delay, Duration::from_secs(5));
}
