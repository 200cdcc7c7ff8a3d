// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-key TTL cache used by the tenant loaders.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

pub(crate) struct TtlCache<V> {
    ttl: Duration,
    entries: DashMap<String, (Instant, V)>,
}

impl<V: Clone> TtlCache<V> {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Fresh value for `key`, dropping it when stale.
    pub(crate) fn get(&self, key: &str) -> Option<V> {
        let fresh = self.entries.get(key).and_then(|entry| {
            let (stored_at, value) = entry.value();
            (stored_at.elapsed() < self.ttl).then(|| value.clone())
        });
        if fresh.is_none() {
            self.entries.remove(key);
        }
        fresh
    }

    pub(crate) fn insert(&self, key: String, value: V) {
        if !self.ttl.is_zero() {
            self.entries.insert(key, (Instant::now(), value));
        }
    }

    /// Drops keys equal to `key` or starting with `{key}:`.
    pub(crate) fn invalidate(&self, key: &str) {
        let prefix = format!("{key}:");
        self.entries
            .retain(|k, _| k != key && !k.starts_with(&prefix));
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.insert("d1".into(), 7);
        assert_eq!(cache.get("d1"), Some(7));

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(cache.get("d1"), None);
    }

    #[test]
    fn invalidate_drops_scoped_keys() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("d1".into(), 1);
        cache.insert("d1:tc1".into(), 2);
        cache.insert("d10:tc1".into(), 3);
        cache.invalidate("d1");
        assert_eq!(cache.get("d1"), None);
        assert_eq!(cache.get("d1:tc1"), None);
        assert_eq!(cache.get("d10:tc1"), Some(3));
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("d1".into(), 1);
        assert_eq!(cache.get("d1"), None);
    }
}
