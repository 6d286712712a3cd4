//! Executor composition: one call pipeline from two independent options.
//!
//! | retry | rate-limit | resulting pipeline                    |
//! |-------|------------|---------------------------------------|
//! | yes   | yes        | retry(scoped-rate-limit-guard(call))  |
//! | yes   | no         | retry(call)                           |
//! | no    | yes        | scoped-rate-limit-guard(call)         |
//! | no    | no         | call unchanged                        |
//!
//! Admission failure propagates before the call executes; with retry
//! outermost, every attempt re-acquires admission. Executors are transient
//! and rebuilt per request — both strategies do so, and the
//! stale-while-revalidate fallback rebuilds with admission bypassed.

use std::sync::Arc;

use crate::Result;
use crate::limiter::{RateLimits, SlidingWindowRateLimiter};
use crate::retry::{RetryConfig, with_retry};
use crate::traits::{StorageBackend, UpstreamCall};

/// Whether a pipeline enforces the configured rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Enforced,
    Bypassed,
}

/// Per-call pipeline over the wrapped upstream call.
pub(crate) struct Executor {
    retry: Option<RetryConfig>,
    limiter: Option<SlidingWindowRateLimiter>,
}

impl Executor {
    pub(crate) fn new(retry: Option<RetryConfig>, limiter: Option<SlidingWindowRateLimiter>) -> Self {
        Self { retry, limiter }
    }

    pub(crate) async fn run(&self, call: &UpstreamCall) -> Result<String> {
        match (&self.retry, &self.limiter) {
            (Some(config), Some(limiter)) => {
                with_retry(config, "guarded upstream call", || limiter.guard(call)).await
            }
            (Some(config), None) => with_retry(config, "upstream call", || call()).await,
            (None, Some(limiter)) => limiter.guard(call).await,
            (None, None) => call().await,
        }
    }
}

/// Build the pipeline for one request.
///
/// The limiter is keyed on the request's cache key; `Admission::Bypassed`
/// forces it out regardless of configuration.
pub(crate) fn build_executor(
    backend: &Arc<dyn StorageBackend>,
    retry: Option<&RetryConfig>,
    limits: Option<&RateLimits>,
    key: &str,
    admission: Admission,
) -> Result<Executor> {
    let limiter = match (limits, admission) {
        (Some(limits), Admission::Enforced) => Some(SlidingWindowRateLimiter::new(
            Arc::clone(backend),
            key,
            limits.clone(),
        )?),
        _ => None,
    };
    Ok(Executor::new(retry.cloned(), limiter))
}
