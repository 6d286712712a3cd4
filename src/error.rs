//! Mimir error types

use std::time::Duration;

use crate::limiter::Period;

/// Mimir error types
#[derive(Debug, thiserror::Error)]
pub enum MimirError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Admission control
    #[error("limit exceeded, limit per {period}: {ceiling} counted calls: {observed}")]
    RateLimitExceeded {
        period: Period,
        ceiling: u32,
        observed: u64,
    },

    // Cache-boundary errors
    /// A configured validator rejected a raw read. Strategies treat this
    /// identically to a cache miss; it never crosses the strategy boundary.
    #[error("cached value failed validation")]
    InvalidCachedValue,

    /// A configured filter rejected a computed result on write. The write is
    /// skipped; the result is still returned to the caller.
    #[error("value rejected by cache filter")]
    NonCacheableValue,

    // Upstream call errors
    #[error("upstream error: {message}")]
    Upstream { message: String, transient: bool },

    #[error("upstream rate limited, retry after {retry_after:?}")]
    UpstreamRateLimited { retry_after: Option<Duration> },

    // Storage backend errors
    #[error("storage error: {0}")]
    Storage(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MimirError {
    /// Whether the retry adapter should attempt this failure again.
    ///
    /// Only upstream-side failures can be transient. Admission denials
    /// (`RateLimitExceeded`) are deliberately excluded: retrying them inside
    /// the pipeline would mask the signal the stale-while-revalidate
    /// fallback path dispatches on.
    pub fn is_transient(&self) -> bool {
        match self {
            MimirError::Upstream { transient, .. } => *transient,
            MimirError::UpstreamRateLimited { .. } => true,
            _ => false,
        }
    }

    /// Backoff hint from an upstream rate-limit response, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MimirError::UpstreamRateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Shorthand for a transient upstream failure.
    pub fn upstream_transient(message: impl Into<String>) -> Self {
        MimirError::Upstream {
            message: message.into(),
            transient: true,
        }
    }

    /// Shorthand for a permanent upstream failure.
    pub fn upstream_permanent(message: impl Into<String>) -> Self {
        MimirError::Upstream {
            message: message.into(),
            transient: false,
        }
    }
}

/// Result type alias for mimir operations
pub type Result<T> = std::result::Result<T, MimirError>;
