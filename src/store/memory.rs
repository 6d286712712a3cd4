//! In-process storage backend.
//!
//! Emulates a shared key-value store with ordered sets, for tests and
//! single-node embedding. Expiry is lazy: an expired entry is dropped on the
//! read that observes it. The trim+count batch holds one write lock for its
//! whole duration, giving it the same atomicity the redis pipeline provides.

use std::collections::{BTreeSet, HashMap};
use std::ops::Bound::Included;
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::WriteOptions;
use crate::traits::StorageBackend;
use crate::{MimirError, Result};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory [`StorageBackend`].
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
    windows: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn expiry_for(options: &WriteOptions) -> Option<Instant> {
        if let Some(ttl) = options.ttl {
            return Some(Instant::now() + ttl);
        }
        if let Some(at) = options.expire_at {
            let remaining = at
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO);
            return Some(Instant::now() + remaining);
        }
        None
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }
        // Expired: drop it so existence checks on later writes see a miss.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, options: &WriteOptions) -> Result<()> {
        if options.if_absent && options.if_present {
            return Err(MimirError::Configuration(
                "if_absent and if_present are mutually exclusive".to_owned(),
            ));
        }
        let mut entries = self.entries.write().await;
        let existing = entries.get(key).filter(|entry| !entry.is_expired());
        if options.if_absent && existing.is_some() {
            return Ok(());
        }
        if options.if_present && existing.is_none() {
            return Ok(());
        }
        let expires_at = if options.keep_ttl {
            existing.and_then(|entry| entry.expires_at)
        } else {
            Self::expiry_for(options)
        };
        entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn trim_and_count(
        &self,
        key: &str,
        cutoff: &str,
        ranges: &[(String, String)],
    ) -> Result<Vec<u64>> {
        let mut windows = self.windows.write().await;
        let set = windows.entry(key.to_owned()).or_default();
        let kept = set.split_off(cutoff);
        *set = kept;
        let counts = ranges
            .iter()
            .map(|(min, max)| {
                set.range::<str, _>((Included(min.as_str()), Included(max.as_str())))
                    .count() as u64
            })
            .collect();
        Ok(counts)
    }

    async fn add_member(&self, key: &str, member: &str) -> Result<()> {
        let mut windows = self.windows.write().await;
        windows
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let backend = MemoryBackend::new();
        backend.set("k", "v", &WriteOptions::new()).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn ttl_lapse_turns_hit_into_miss() {
        let backend = MemoryBackend::new();
        let options = WriteOptions::new().ttl(Duration::from_millis(20));
        backend.set("k", "v", &options).await.unwrap();
        assert!(backend.get("k").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(backend.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn if_absent_refuses_overwrite() {
        let backend = MemoryBackend::new();
        let options = WriteOptions::new().if_absent();
        backend.set("k", "first", &options).await.unwrap();
        backend.set("k", "second", &options).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn if_present_skips_cold_key() {
        let backend = MemoryBackend::new();
        let options = WriteOptions::new().if_present();
        backend.set("k", "v", &options).await.unwrap();
        assert!(backend.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keep_ttl_preserves_existing_expiry() {
        let backend = MemoryBackend::new();
        backend
            .set("k", "v1", &WriteOptions::new().ttl(Duration::from_millis(50)))
            .await
            .unwrap();
        backend
            .set("k", "v2", &WriteOptions::new().keep_ttl())
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v2"));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(backend.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn trim_drops_members_below_cutoff() {
        let backend = MemoryBackend::new();
        for member in ["001", "002", "005"] {
            backend.add_member("w", member).await.unwrap();
        }
        let counts = backend
            .trim_and_count("w", "002", &[("000".to_owned(), "009".to_owned())])
            .await
            .unwrap();
        assert_eq!(counts, vec![2]); // "001" trimmed, "002" and "005" remain
    }

    #[tokio::test]
    async fn count_ranges_are_inclusive() {
        let backend = MemoryBackend::new();
        for member in ["001", "002", "003"] {
            backend.add_member("w", member).await.unwrap();
        }
        let counts = backend
            .trim_and_count(
                "w",
                "000",
                &[
                    ("001".to_owned(), "002".to_owned()),
                    ("003".to_owned(), "003".to_owned()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(counts, vec![2, 1]);
    }
}
