//! Core traits: the storage seam, the strategy contract, and the key factory.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::Result;
use crate::key::CallContext;
use crate::store::WriteOptions;

/// The wrapped upstream call, adapted to an opaque serialized payload.
///
/// Built once per interception and shared between the inline path and any
/// detached background refresh, so it must be callable more than once.
pub type UpstreamCall = Arc<dyn Fn() -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// Shared key-value store with an ordered-set primitive.
///
/// The engine performs no client-side locking around a backend handle; it is
/// a shared, reentrant resource used by unboundedly many concurrent logical
/// calls. The only atomicity the engine relies on is that a single
/// [`trim_and_count`](StorageBackend::trim_and_count) batch is not
/// interleaved with other window operations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the raw payload stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, honoring `options` verbatim.
    async fn set(&self, key: &str, value: &str, options: &WriteOptions) -> Result<()>;

    /// One atomic batch over the ordered set at `key`: remove members
    /// lexicographically below `cutoff`, then count members within each
    /// inclusive `[min, max]` range, in order.
    async fn trim_and_count(
        &self,
        key: &str,
        cutoff: &str,
        ranges: &[(String, String)],
    ) -> Result<Vec<u64>>;

    /// Add a member to the ordered set at `key`.
    async fn add_member(&self, key: &str, member: &str) -> Result<()>;
}

/// The public fetch-with-cache contract both strategies implement.
///
/// `fetch` owns the whole per-call state machine:
/// `START → LOOKUP → {HIT, MISS} → … → DONE`.
#[async_trait]
pub trait CacheStrategy: Send + Sync {
    /// Resolve `key` to a payload, calling upstream as the strategy dictates.
    async fn fetch(&self, key: &str, call: UpstreamCall) -> Result<String>;
}

/// Derives the cache/rate-limit key for one interception.
///
/// The engine places no constraint on the output beyond determinism:
/// identical context must always produce an identical key.
pub trait KeyFactory: Send + Sync {
    fn build(&self, ctx: &CallContext<'_>) -> String;
}
