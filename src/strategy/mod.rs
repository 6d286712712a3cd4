//! Cache-consistency strategies.
//!
//! Two implementations of the [`CacheStrategy`](crate::traits::CacheStrategy)
//! contract:
//!
//! - [`BoundedFreshness`] — cache-aside with TTL. A hit is served as-is; a
//!   miss pays for the upstream call inline and writes through before
//!   returning. Admission denial and retry exhaustion surface to the caller.
//!
//! - [`StaleWhileRevalidate`] — background updater. A hit is served
//!   immediately while a detached task refreshes the entry; a miss pays
//!   inline, falling back to a retry-only pipeline when admission is denied
//!   so a cold cache never starves a caller.

mod bounded;
mod revalidate;

pub use bounded::BoundedFreshness;
pub use revalidate::StaleWhileRevalidate;

use tracing::debug;

use crate::store::CacheStore;
use crate::{MimirError, Result};

/// LOOKUP step shared by both strategies: a validator rejection is a miss,
/// never an error past this boundary.
pub(crate) async fn lookup(store: &CacheStore, key: &str) -> Result<Option<String>> {
    match store.get(key).await {
        Ok(value) => Ok(value),
        Err(MimirError::InvalidCachedValue) => {
            debug!(key, "cached value failed validation, treating as miss");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
