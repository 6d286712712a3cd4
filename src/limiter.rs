//! Sliding-window rate limiter over the shared ordered store.
//!
//! Admission counts requests within a moving interval ending at "now"
//! rather than fixed buckets. Each limited key owns one sorted set whose
//! members are fixed-width encodings of request timestamps; one atomic
//! trim+count batch prunes members older than the widest configured window
//! and counts each configured sub-window. The admission check and the
//! release record are two separate store round-trips — concurrent callers
//! can both pass the count before either records. That check-then-act race
//! is accepted; see the crate docs.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::traits::{StorageBackend, UpstreamCall};
use crate::{MimirError, Result, telemetry};

const KEY_SUFFIX: &str = ":rate_limiter";

/// Rate-limit periods, tightest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Second,
    Minute,
    Hour,
    Day,
}

impl Period {
    /// Window size in seconds.
    pub fn window(self) -> u64 {
        match self {
            Period::Second => 1,
            Period::Minute => 60,
            Period::Hour => 3_600,
            Period::Day => 86_400,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Period::Second => "second",
            Period::Minute => "minute",
            Period::Hour => "hour",
            Period::Day => "day",
        };
        f.write_str(name)
    }
}

/// Per-period admission ceilings. All four are optional and apply to the
/// same sliding window.
///
/// ```rust
/// # use mimir::RateLimits;
/// let limits = RateLimits::new().per_second(1).per_minute(30);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RateLimits {
    pub per_second: Option<u32>,
    pub per_minute: Option<u32>,
    pub per_hour: Option<u32>,
    pub per_day: Option<u32>,
}

impl RateLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn per_second(mut self, ceiling: u32) -> Self {
        self.per_second = Some(ceiling);
        self
    }

    pub fn per_minute(mut self, ceiling: u32) -> Self {
        self.per_minute = Some(ceiling);
        self
    }

    pub fn per_hour(mut self, ceiling: u32) -> Self {
        self.per_hour = Some(ceiling);
        self
    }

    pub fn per_day(mut self, ceiling: u32) -> Self {
        self.per_day = Some(ceiling);
        self
    }

    /// Configured `(period, ceiling)` pairs, tightest period first.
    fn configured(&self) -> Vec<(Period, u32)> {
        [
            (Period::Second, self.per_second),
            (Period::Minute, self.per_minute),
            (Period::Hour, self.per_hour),
            (Period::Day, self.per_day),
        ]
        .into_iter()
        .filter_map(|(period, ceiling)| ceiling.map(|c| (period, c)))
        .collect()
    }

    /// Ceilings must be non-decreasing as the window widens: a tighter
    /// period may not allow more requests than a looser one.
    pub(crate) fn validate(&self) -> Result<()> {
        let configured = self.configured();
        for (i, (tighter, tighter_ceiling)) in configured.iter().enumerate() {
            for (looser, looser_ceiling) in &configured[i + 1..] {
                if tighter_ceiling > looser_ceiling {
                    return Err(MimirError::Configuration(format!(
                        "per-{tighter} ceiling {tighter_ceiling} exceeds per-{looser} ceiling {looser_ceiling}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Widest configured window in seconds; one hour when nothing is set.
    fn widest_window(&self) -> u64 {
        self.configured()
            .iter()
            .map(|(period, _)| period.window())
            .max()
            .unwrap_or(Period::Hour.window())
    }
}

/// Encode a point in time as a sorted-set member.
///
/// Fixed-width zero-padded seconds plus nanoseconds, so lexicographic
/// order over members equals numeric order over timestamps.
fn encode_timestamp(at: Duration) -> String {
    format!("{:011}.{:09}", at.as_secs(), at.subsec_nanos())
}

/// Sliding-window admission control for one key.
///
/// Built per request by the executor composer; construction validates the
/// ceiling ordering and is otherwise free. The scoped acquisition contract:
/// [`guard`](Self::guard) acquires admission, runs the call, and records
/// the release timestamp whether the call succeeded or not. A denied
/// admission never enters the scope and records nothing.
pub struct SlidingWindowRateLimiter {
    backend: Arc<dyn StorageBackend>,
    key: String,
    limits: RateLimits,
}

impl SlidingWindowRateLimiter {
    /// Create a limiter for `key` against the shared store.
    ///
    /// Fails with [`MimirError::Configuration`] when a tighter period's
    /// ceiling exceeds a looser period's.
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        key: impl Into<String>,
        limits: RateLimits,
    ) -> Result<Self> {
        limits.validate()?;
        Ok(Self {
            backend,
            key: format!("{}{KEY_SUFFIX}", key.into()),
            limits,
        })
    }

    /// Run `call` inside the admission scope.
    pub async fn guard(&self, call: &UpstreamCall) -> Result<String> {
        self.acquire(SystemTime::now()).await?;
        let outcome = call().await;
        let recorded = self.release(SystemTime::now()).await;
        match (outcome, recorded) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(record_err)) => Err(record_err),
            (Err(call_err), _) => Err(call_err),
        }
    }

    async fn acquire(&self, now: SystemTime) -> Result<()> {
        let now = unix_time(now);
        let cutoff =
            encode_timestamp(now.saturating_sub(Duration::from_secs(self.limits.widest_window())));
        let configured = self.limits.configured();
        let ranges: Vec<(String, String)> = configured
            .iter()
            .map(|(period, _)| {
                (
                    encode_timestamp(now.saturating_sub(Duration::from_secs(period.window()))),
                    encode_timestamp(now),
                )
            })
            .collect();

        let counts = self
            .backend
            .trim_and_count(&self.key, &cutoff, &ranges)
            .await?;

        // Tightest violated constraint is reported first.
        for ((period, ceiling), observed) in configured.into_iter().zip(counts) {
            if observed >= u64::from(ceiling) {
                metrics::counter!(telemetry::RATE_LIMITED_TOTAL, "period" => period.to_string())
                    .increment(1);
                debug!(key = %self.key, %period, ceiling, observed, "admission denied");
                return Err(MimirError::RateLimitExceeded {
                    period,
                    ceiling,
                    observed,
                });
            }
        }
        Ok(())
    }

    async fn release(&self, now: SystemTime) -> Result<()> {
        self.backend
            .add_member(&self.key, &encode_timestamp(unix_time(now)))
            .await
    }
}

fn unix_time(at: SystemTime) -> Duration {
    at.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO)
}
