//! Tests for [`SlidingWindowRateLimiter`] — ceiling validation and the
//! scoped acquisition contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use mimir::{
    MemoryBackend, MimirError, Period, RateLimits, SlidingWindowRateLimiter, StorageBackend,
    UpstreamCall,
};

fn backend() -> Arc<dyn StorageBackend> {
    Arc::new(MemoryBackend::new())
}

fn limits(
    second: Option<u32>,
    minute: Option<u32>,
    hour: Option<u32>,
    day: Option<u32>,
) -> RateLimits {
    RateLimits {
        per_second: second,
        per_minute: minute,
        per_hour: hour,
        per_day: day,
    }
}

/// Upstream stand-in that counts invocations and always succeeds.
fn ok_call(counter: Arc<AtomicU32>) -> UpstreamCall {
    Arc::new(move || {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok("data".to_owned())
        })
    })
}

fn failing_call() -> UpstreamCall {
    Arc::new(|| Box::pin(async { Err(MimirError::upstream_permanent("integration down")) }))
}

// ============================================================================
// Ceiling validation
// ============================================================================

#[test]
fn ceiling_ordering_matrix() {
    let cases: &[(Option<u32>, Option<u32>, Option<u32>, Option<u32>, bool)] = &[
        (Some(1), Some(2), Some(3), Some(4), true),
        (Some(2), Some(1), Some(2), Some(3), false),
        (Some(1), Some(3), Some(2), Some(3), false),
        (Some(1), Some(2), Some(4), Some(3), false),
        (Some(4), Some(1), Some(4), Some(3), false),
        (Some(1), Some(2), None, Some(4), true),
        (Some(1), Some(5), None, Some(4), false),
    ];
    for (second, minute, hour, day, ok) in cases {
        let result = SlidingWindowRateLimiter::new(
            backend(),
            "unique_key",
            limits(*second, *minute, *hour, *day),
        );
        if *ok {
            assert!(
                result.is_ok(),
                "expected {second:?}/{minute:?}/{hour:?}/{day:?} to construct"
            );
        } else {
            assert!(
                matches!(result, Err(MimirError::Configuration(_))),
                "expected {second:?}/{minute:?}/{hour:?}/{day:?} to fail"
            );
        }
    }
}

#[test]
fn equal_ceilings_are_allowed() {
    assert!(
        SlidingWindowRateLimiter::new(backend(), "k", RateLimits::new().per_second(2).per_minute(2))
            .is_ok()
    );
}

// ============================================================================
// Admission
// ============================================================================

#[tokio::test]
async fn second_admission_within_a_second_is_denied() {
    let limiter = SlidingWindowRateLimiter::new(
        backend(),
        "unique_key",
        RateLimits::new().per_second(1).per_minute(60),
    )
    .unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let call = ok_call(calls.clone());

    limiter.guard(&call).await.unwrap();

    let denied = limiter.guard(&call).await;
    match denied {
        Err(MimirError::RateLimitExceeded {
            period,
            ceiling,
            observed,
        }) => {
            assert_eq!(period, Period::Second);
            assert_eq!(ceiling, 1);
            assert_eq!(observed, 1);
        }
        other => panic!("expected RateLimitExceeded, got {other:?}"),
    }
    // The denied call never reached upstream.
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn denial_reports_the_tightest_violated_period() {
    let limiter = SlidingWindowRateLimiter::new(
        backend(),
        "k",
        RateLimits::new().per_second(1).per_minute(1),
    )
    .unwrap();
    let call = ok_call(Arc::new(AtomicU32::new(0)));

    limiter.guard(&call).await.unwrap();
    let denied = limiter.guard(&call).await;
    assert!(matches!(
        denied,
        Err(MimirError::RateLimitExceeded {
            period: Period::Second,
            ..
        })
    ));
}

#[tokio::test]
async fn failed_calls_still_consume_budget() {
    let limiter =
        SlidingWindowRateLimiter::new(backend(), "k", RateLimits::new().per_minute(2)).unwrap();
    let call = failing_call();

    for _ in 0..2 {
        assert!(matches!(
            limiter.guard(&call).await,
            Err(MimirError::Upstream { .. })
        ));
    }
    // Release recorded both failures; the third admission is denied.
    assert!(matches!(
        limiter.guard(&call).await,
        Err(MimirError::RateLimitExceeded {
            period: Period::Minute,
            ..
        })
    ));
}

#[tokio::test]
async fn window_slides_past_old_requests() {
    let limiter =
        SlidingWindowRateLimiter::new(backend(), "k", RateLimits::new().per_second(1)).unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let call = ok_call(calls.clone());

    limiter.guard(&call).await.unwrap();
    assert!(limiter.guard(&call).await.is_err());

    tokio::time::sleep(Duration::from_millis(1_100)).await;

    limiter.guard(&call).await.unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn distinct_keys_have_independent_windows() {
    let backend = backend();
    let limits = RateLimits::new().per_second(1);
    let a = SlidingWindowRateLimiter::new(backend.clone(), "a", limits.clone()).unwrap();
    let b = SlidingWindowRateLimiter::new(backend, "b", limits).unwrap();
    let call = ok_call(Arc::new(AtomicU32::new(0)));

    a.guard(&call).await.unwrap();
    b.guard(&call).await.unwrap();
    assert!(a.guard(&call).await.is_err());
}
