// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, concurrent key/value cache with per-entry expiry.
//!
//! Expiry is lazy: an expired entry is dropped the next time it is looked
//! up (or when the cache is full and needs room). Time is read from the tokio
//! clock so tests can pause and advance it.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// A string-keyed TTL cache shared across tasks.
///
/// Concurrent `set` calls on the same key are last-write-wins.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the value for `key` if present and not expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        None
    }

    /// Stores `value` under `key` for `ttl`.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.make_room(now);
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    /// Whether `key` currently maps to a live entry.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .map(|entry| entry.is_live(now))
            .unwrap_or(false)
    }

    /// Removes `key`, returning its value if it was still live.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .and_then(|(_, entry)| entry.is_live(now).then_some(entry.value))
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn make_room(&self, now: Instant) {
        let purged = {
            let before = self.entries.len();
            self.entries.retain(|_, entry| entry.is_live(now));
            before.saturating_sub(self.entries.len())
        };
        if self.entries.len() < self.max_entries {
            debug!(purged, "cache full, purged expired entries");
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|item| item.value().expires_at)
            .map(|item| item.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!(key = %key, "cache full, evicted entry closest to expiry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test(start_paused = true)]
    async fn get_returns_value_before_ttl() {
        let cache = TtlCache::new(16);
        cache.set("sydney weather", "sunny".to_string(), Duration::from_millis(5000));

        tokio::time::advance(Duration::from_millis(4999)).await;
        assert_eq!(cache.get("sydney weather").as_deref(), Some("sunny"));
        assert!(cache.has("sydney weather"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_absent_and_evicted() {
        let cache = TtlCache::new(16);
        cache.set("sydney weather", "sunny".to_string(), Duration::from_millis(5000));

        tokio::time::advance(Duration::from_millis(6000)).await;
        assert!(!cache.has("sydney weather"));
        assert_eq!(cache.get("sydney weather"), None);
        assert_eq!(cache.len(), 0, "lazy eviction should drop the entry on read");
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_previous_value_and_ttl() {
        let cache = TtlCache::new(16);
        cache.set("k", 1, Duration::from_secs(1));
        cache.set("k", 2, Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get("k"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn full_cache_prefers_evicting_expired_entries() {
        let cache = TtlCache::new(2);
        cache.set("short", 1, Duration::from_secs(1));
        cache.set("long", 2, Duration::from_secs(100));

        tokio::time::advance(Duration::from_secs(2)).await;
        cache.set("new", 3, Duration::from_secs(100));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("long"), Some(2));
        assert_eq!(cache.get("new"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn full_cache_evicts_entry_closest_to_expiry() {
        let cache = TtlCache::new(2);
        cache.set("a", 1, Duration::from_secs(10));
        cache.set("b", 2, Duration::from_secs(50));
        cache.set("c", 3, Duration::from_secs(30));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_and_remove() {
        let cache = TtlCache::new(8);
        cache.set("a", 1, Duration::from_secs(1));
        cache.set("b", 2, Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.remove("b"), Some(2));
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn value_visible_strictly_within_ttl(
            key in "[a-z ]{1,24}",
            value in any::<u32>(),
            ttl_ms in 1u64..10_000,
            before in 0u64..10_000,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            rt.block_on(async {
                let cache = TtlCache::new(4);
                cache.set(key.clone(), value, Duration::from_millis(ttl_ms));

                let early = before % ttl_ms;
                tokio::time::advance(Duration::from_millis(early)).await;
                prop_assert_eq!(cache.get(&key), Some(value));

                tokio::time::advance(Duration::from_millis(ttl_ms - early + 1)).await;
                prop_assert_eq!(cache.get(&key), None);
                Ok::<(), proptest::test_runner::TestCaseError>(())
            })?;
        }
    }
}
