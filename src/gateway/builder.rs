//! Builder for configuring interceptor instances.

use std::sync::Arc;

use super::Interceptor;
use crate::key::{DefaultKeyFactory, Namespace};
use crate::limiter::RateLimits;
use crate::retry::RetryConfig;
use crate::store::{CachePredicate, CacheStore, WriteOptions};
use crate::strategy::{BoundedFreshness, StaleWhileRevalidate};
use crate::traits::{CacheStrategy, KeyFactory, StorageBackend};
use crate::{MimirError, Result};

/// Main entry point for creating interceptor instances.
pub struct Mimir;

impl Mimir {
    /// Create a new builder for configuring an interceptor.
    pub fn builder() -> MimirBuilder {
        MimirBuilder::new()
    }
}

enum StrategyKind {
    BoundedFreshness,
    StaleWhileRevalidate,
}

/// Builder for configuring interceptor instances.
pub struct MimirBuilder {
    backend: Option<Arc<dyn StorageBackend>>,
    namespace: Option<Namespace>,
    key_factory: Option<Arc<dyn KeyFactory>>,
    validators: Vec<CachePredicate>,
    filters: Vec<CachePredicate>,
    write_options: WriteOptions,
    retry: Option<RetryConfig>,
    rate_limits: Option<RateLimits>,
    strategy: StrategyKind,
}

impl MimirBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            namespace: None,
            key_factory: None,
            validators: Vec::new(),
            filters: Vec::new(),
            write_options: WriteOptions::default(),
            retry: None,
            rate_limits: None,
            strategy: StrategyKind::BoundedFreshness,
        }
    }

    /// Set the shared storage backend all components run against.
    pub fn backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the namespace the default key factory renders.
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Replace the key encoding wholesale with a custom factory.
    pub fn key_factory(mut self, factory: Arc<dyn KeyFactory>) -> Self {
        self.key_factory = Some(factory);
        self
    }

    /// Add a read-side validator; a rejected read is treated as a miss.
    pub fn validator(mut self, predicate: CachePredicate) -> Self {
        self.validators.push(predicate);
        self
    }

    /// Add a write-side filter; a rejected payload is not cached.
    pub fn filter(mut self, predicate: CachePredicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Backend write options forwarded verbatim on every write-through.
    pub fn write_options(mut self, options: WriteOptions) -> Self {
        self.write_options = options;
        self
    }

    /// Wrap upstream calls with a retry policy.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Guard upstream calls with sliding-window admission control.
    pub fn rate_limits(mut self, limits: RateLimits) -> Self {
        self.rate_limits = Some(limits);
        self
    }

    /// Use the bounded-freshness (TTL cache-aside) strategy. Default.
    pub fn bounded_freshness(mut self) -> Self {
        self.strategy = StrategyKind::BoundedFreshness;
        self
    }

    /// Use the stale-while-revalidate (background updater) strategy.
    pub fn stale_while_revalidate(mut self) -> Self {
        self.strategy = StrategyKind::StaleWhileRevalidate;
        self
    }

    /// Validate the configuration and build the interceptor.
    pub fn build(self) -> Result<Interceptor> {
        let backend = self.backend.ok_or_else(|| {
            MimirError::Configuration("no storage backend configured".to_owned())
        })?;
        let key_factory: Arc<dyn KeyFactory> = match (self.key_factory, self.namespace) {
            (Some(factory), _) => factory,
            (None, Some(namespace)) => Arc::new(DefaultKeyFactory::new(namespace)),
            (None, None) => {
                return Err(MimirError::Configuration(
                    "no namespace or key factory configured".to_owned(),
                ));
            }
        };
        if let Some(limits) = &self.rate_limits {
            limits.validate()?;
        }

        let mut store = CacheStore::new(backend).write_options(self.write_options);
        for validator in self.validators {
            store = store.validator(validator);
        }
        for filter in self.filters {
            store = store.filter(filter);
        }
        let store = Arc::new(store);

        let strategy: Arc<dyn CacheStrategy> = match self.strategy {
            StrategyKind::BoundedFreshness => {
                let mut strategy = BoundedFreshness::new(store);
                if let Some(config) = self.retry {
                    strategy = strategy.retry(config);
                }
                if let Some(limits) = self.rate_limits {
                    strategy = strategy.rate_limits(limits);
                }
                Arc::new(strategy)
            }
            StrategyKind::StaleWhileRevalidate => {
                let mut strategy = StaleWhileRevalidate::new(store);
                if let Some(config) = self.retry {
                    strategy = strategy.retry(config);
                }
                if let Some(limits) = self.rate_limits {
                    strategy = strategy.rate_limits(limits);
                }
                Arc::new(strategy)
            }
        };

        Ok(Interceptor::new(key_factory, strategy))
    }
}

impl Default for MimirBuilder {
    fn default() -> Self {
        Self::new()
    }
}
