//! The interception entry point.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;
use crate::key::CallContext;
use crate::traits::{CacheStrategy, KeyFactory, UpstreamCall};

/// Binds a key factory and a cache strategy into one callable pipeline.
///
/// One interceptor fronts one logical upstream function; the per-call
/// [`CallContext`] distinguishes argument combinations. Payloads cross the
/// strategy boundary as opaque serialized strings: `invoke` encodes the
/// upstream's typed result on the way in and decodes on the way out, so
/// cached and freshly-computed values take the same path.
pub struct Interceptor {
    key_factory: Arc<dyn KeyFactory>,
    strategy: Arc<dyn CacheStrategy>,
}

impl Interceptor {
    pub fn new(key_factory: Arc<dyn KeyFactory>, strategy: Arc<dyn CacheStrategy>) -> Self {
        Self {
            key_factory,
            strategy,
        }
    }

    /// Run one intercepted call.
    ///
    /// `call` is the upstream closure; it may be invoked zero times (hit),
    /// once (miss), or more than once (retry attempts, background refresh),
    /// so it must be safe to re-invoke.
    pub async fn invoke<T, F, Fut>(&self, ctx: &CallContext<'_>, call: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let key = self.key_factory.build(ctx);
        let call: UpstreamCall = Arc::new(move || {
            let fut = call();
            Box::pin(async move {
                let value = fut.await?;
                Ok(serde_json::to_string(&value)?)
            })
        });
        let raw = self.strategy.fetch(&key, call).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}
