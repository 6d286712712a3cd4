//! Telemetry metric name constants.
//!
//! Centralised metric names for mimir operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `mimir_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `strategy` — active cache strategy ("bounded_freshness" | "stale_while_revalidate")
//! - `period` — rate-limit period that denied admission ("second" | "minute" | "hour" | "day")
//! - `status` — background refresh outcome: "ok" or "dropped"

/// Total cache hits.
///
/// Labels: `strategy`.
pub const CACHE_HITS_TOTAL: &str = "mimir_cache_hits_total";

/// Total cache misses (validator rejections count as misses).
///
/// Labels: `strategy`.
pub const CACHE_MISSES_TOTAL: &str = "mimir_cache_misses_total";

/// Total retry attempts (not counting the initial request).
pub const RETRIES_TOTAL: &str = "mimir_retries_total";

/// Total admissions denied by the sliding-window rate limiter.
///
/// Labels: `period`.
pub const RATE_LIMITED_TOTAL: &str = "mimir_rate_limited_total";

/// Total background refreshes detached by the stale-while-revalidate
/// strategy.
///
/// Labels: `status` ("ok" | "dropped").
pub const REFRESHES_TOTAL: &str = "mimir_background_refreshes_total";
