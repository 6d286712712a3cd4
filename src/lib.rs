//! Mimir - call interception with caching, admission control and retry
//!
//! This crate wraps any asynchronous remote-call function with transparent
//! caching, sliding-window rate limiting, and retry behavior. It fronts
//! unreliable or rate-limited upstreams (third-party integrations, partner
//! APIs) and answers one question per call: can a cached answer be served,
//! and if not, how is the upstream called safely within its request budget?
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mimir::{
//!     CallContext, MemoryBackend, Mimir, Namespace, RateLimits, RetryConfig, WriteOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> mimir::Result<()> {
//!     let interceptor = Mimir::builder()
//!         .backend(Arc::new(MemoryBackend::new()))
//!         .namespace(Namespace::new("simi").version("1.1").integration("lk"))
//!         .write_options(WriteOptions::new().ttl(Duration::from_secs(300)))
//!         .retry(RetryConfig::new().max_attempts(3))
//!         .rate_limits(RateLimits::new().per_second(1).per_minute(30))
//!         .stale_while_revalidate()
//!         .build()?;
//!
//!     let ctx = CallContext::new("get_document").arg("patient_id", 42);
//!     let document: String = interceptor
//!         .invoke(&ctx, || async { Ok("<document/>".to_owned()) })
//!         .await?;
//!
//!     println!("{document}");
//!     Ok(())
//! }
//! ```
//!
//! # Consistency under concurrency
//!
//! There is no mutual exclusion across concurrent calls for the same key:
//! two callers racing a cold cache may both execute the upstream, and two
//! callers may both pass the admission count before either records its
//! timestamp. At-least-once upstream execution under races is the accepted
//! trade against a distributed lock.

pub mod error;
mod executor;
pub mod gateway;
pub mod key;
pub mod limiter;
pub mod retry;
pub mod store;
pub mod strategy;
pub mod telemetry;
pub mod traits;

// Re-export main types at crate root
pub use error::{MimirError, Result};
pub use gateway::{Interceptor, Mimir, MimirBuilder};
pub use key::{CallContext, DefaultKeyFactory, Namespace};
pub use limiter::{Period, RateLimits, SlidingWindowRateLimiter};
pub use retry::RetryConfig;
pub use store::{CachePredicate, CacheStore, MemoryBackend, WriteOptions};
#[cfg(feature = "redis-backend")]
pub use store::RedisBackend;
pub use strategy::{BoundedFreshness, StaleWhileRevalidate};
pub use traits::{CacheStrategy, KeyFactory, StorageBackend, UpstreamCall};
