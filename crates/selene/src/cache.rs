//! Time-to-live cache shared between concurrent report computations.
//!
//! Entries are write-once: a live entry is never replaced, it only expires.
//! The TTL is injected at construction and the cache instance is handed to
//! whichever component needs it.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Look up `key` as of `now`, dropping the entry if it has expired.
    pub fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    pub fn set(&self, key: K, value: V) -> V {
        self.set_at(key, value, Utc::now())
    }

    /// Store `value` unless a live entry already exists. Returns the value
    /// that is now cached, which is the earlier one when the key was live.
    pub fn set_at(&self, key: K, value: V, now: DateTime<Utc>) -> V {
        let mut entries = self.lock();
        if let Some(existing) = entries.get(&key) {
            if existing.expires_at > now {
                return existing.value.clone();
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: now + self.ttl,
            },
        );
        value
    }

    pub fn evict(&self, key: &K) -> Option<V> {
        self.lock().remove(key).map(|entry| entry.value)
    }

    /// Remove every entry expired at `now`. Returns how many were dropped.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        // a panic while holding the lock cannot leave an entry half-written
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn get_returns_live_entries() {
        let cache = TtlCache::new(Duration::days(30));
        cache.set_at("a", 1, t0());
        assert_eq!(cache.get_at(&"a", t0() + Duration::days(29)), Some(1));
        assert_eq!(cache.get_at(&"b", t0()), None);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = TtlCache::new(Duration::hours(1));
        cache.set_at("a", 1, t0());
        assert_eq!(cache.get_at(&"a", t0() + Duration::hours(1)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn set_is_write_once_while_live() {
        let cache = TtlCache::new(Duration::hours(1));
        assert_eq!(cache.set_at("a", 1, t0()), 1);
        assert_eq!(cache.set_at("a", 2, t0() + Duration::minutes(10)), 1);
        assert_eq!(cache.get_at(&"a", t0() + Duration::minutes(20)), Some(1));

        // once expired, a new value may be written
        assert_eq!(cache.set_at("a", 3, t0() + Duration::hours(2)), 3);
    }

    #[test]
    fn evict_and_purge() {
        let cache = TtlCache::new(Duration::minutes(5));
        cache.set_at(1u32, "x", t0());
        cache.set_at(2u32, "y", t0() + Duration::minutes(4));
        assert_eq!(cache.evict(&1), Some("x"));
        assert_eq!(cache.evict(&1), None);

        cache.set_at(3u32, "z", t0());
        assert_eq!(cache.purge_expired_at(t0() + Duration::minutes(6)), 1);
        assert_eq!(cache.len(), 1);
    }
}
