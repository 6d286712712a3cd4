//! Cache store: validated reads and filtered writes over a pluggable
//! [`StorageBackend`].
//!
//! The store interprets nothing. Validators guard the read side (a malformed
//! payload becomes [`InvalidCachedValue`](crate::MimirError::InvalidCachedValue),
//! which strategies treat as a miss), filters guard the write side (a
//! rejected payload becomes
//! [`NonCacheableValue`](crate::MimirError::NonCacheableValue) and nothing is
//! written), and [`WriteOptions`] are forwarded to the backend verbatim.

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use memory::MemoryBackend;
#[cfg(feature = "redis-backend")]
pub use redis::RedisBackend;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::traits::StorageBackend;
use crate::{MimirError, Result};

/// Read/write predicate over a raw payload.
pub type CachePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Backend write options, passed through unmodified on every `set`.
///
/// Mirrors the expiry and existence controls of a redis-style `SET`:
///
/// ```rust
/// # use mimir::WriteOptions;
/// # use std::time::Duration;
/// let options = WriteOptions::new()
///     .ttl(Duration::from_millis(200))
///     .if_absent();
/// ```
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Relative time-to-live for the entry.
    pub ttl: Option<Duration>,
    /// Absolute expiry time for the entry.
    pub expire_at: Option<SystemTime>,
    /// Only write if the key does not already exist.
    pub if_absent: bool,
    /// Only write if the key already exists.
    pub if_present: bool,
    /// Retain the time-to-live already associated with the key.
    pub keep_ttl: bool,
}

impl WriteOptions {
    /// Create options with no expiry and no existence constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a relative time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set an absolute expiry time.
    pub fn expire_at(mut self, at: SystemTime) -> Self {
        self.expire_at = Some(at);
        self
    }

    /// Only write if the key does not already exist.
    pub fn if_absent(mut self) -> Self {
        self.if_absent = true;
        self
    }

    /// Only write if the key already exists.
    pub fn if_present(mut self) -> Self {
        self.if_present = true;
        self
    }

    /// Retain the time-to-live already associated with the key.
    pub fn keep_ttl(mut self) -> Self {
        self.keep_ttl = true;
        self
    }
}

/// Get/set primitive with pluggable validators and filters.
pub struct CacheStore {
    backend: Arc<dyn StorageBackend>,
    validators: Vec<CachePredicate>,
    filters: Vec<CachePredicate>,
    options: WriteOptions,
}

impl CacheStore {
    /// Create a store over `backend` with no validators, no filters, and
    /// default write options.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            validators: Vec::new(),
            filters: Vec::new(),
            options: WriteOptions::default(),
        }
    }

    /// Add a read-side validator. All validators must accept a raw read.
    pub fn validator(mut self, predicate: CachePredicate) -> Self {
        self.validators.push(predicate);
        self
    }

    /// Add a write-side filter. All filters must accept a payload.
    pub fn filter(mut self, predicate: CachePredicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Set the backend write options forwarded on every `set`.
    pub fn write_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    /// The shared backend handle, for collaborators (the rate limiter)
    /// that need the ordered-set primitive on the same store.
    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.backend)
    }

    /// Read `key`, applying validators to any present value.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.backend.get(key).await?;
        if let Some(raw) = &value
            && !self.validators.iter().all(|validator| validator(raw))
        {
            return Err(MimirError::InvalidCachedValue);
        }
        Ok(value)
    }

    /// Write `value` under `key`, applying filters first.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        if !self.filters.iter().all(|filter| filter(value)) {
            return Err(MimirError::NonCacheableValue);
        }
        self.backend.set(key, value, &self.options).await
    }
}
