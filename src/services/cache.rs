//! Time- and capacity-bounded response cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::models::CacheConfig;
use crate::utils::text::normalize_query;

struct CacheEntry<T> {
    payload: T,
    inserted_at: Instant,
    /// Monotonic write counter; tiebreak for oldest-write eviction when two
    /// inserts land on the same clock tick.
    seq: u64,
}

struct CacheInner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    next_seq: u64,
}

/// Maps normalized queries to previously computed payloads.
///
/// Entries expire lazily after the TTL; at capacity the oldest write is
/// evicted. The whole evict-and-insert sequence runs under one mutex so
/// concurrent writers cannot corrupt the capacity invariant, and the lock
/// is never held across embedding or generation I/O.
pub struct ResponseCache<T> {
    inner: Mutex<CacheInner<T>>,
    capacity: usize,
    ttl: Duration,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            capacity: config.capacity.max(1),
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }

    /// Cache key: digest of the case-folded, trimmed query. Queries
    /// differing only in case or whitespace collide intentionally.
    fn cache_key(query: &str) -> String {
        let hash = Sha256::digest(normalize_query(query).as_bytes());
        hex::encode(hash)
    }

    /// Look up a query. An entry older than the TTL is removed and
    /// reported absent.
    pub fn get(&self, query: &str) -> Option<T> {
        let key = Self::cache_key(query);
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        match inner.entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.payload.clone()),
            Some(_) => {
                inner.entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Insert a payload, evicting the oldest write first when at capacity.
    /// Overwriting an existing key resets its age instead of evicting.
    pub fn put(&self, query: &str, payload: T) {
        let key = Self::cache_key(query);
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| (e.inserted_at, e.seq))
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&oldest);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            CacheEntry {
                payload,
                inserted_at: Instant::now(),
                seq,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize, ttl_secs: u64) -> ResponseCache<String> {
        ResponseCache::new(&CacheConfig { capacity, ttl_secs })
    }

    #[test]
    fn test_get_miss_then_hit() {
        let cache = cache(10, 60);
        assert!(cache.get("what is grace?").is_none());
        cache.put("what is grace?", "answer".to_string());
        assert_eq!(cache.get("what is grace?").unwrap(), "answer");
    }

    #[test]
    fn test_key_normalization_collides_case_and_whitespace() {
        let cache = cache(10, 60);
        cache.put("  What Is Grace?  ", "answer".to_string());
        assert_eq!(cache.get("what is grace?").unwrap(), "answer");
        assert_eq!(cache.get("WHAT IS GRACE?").unwrap(), "answer");
    }

    #[test]
    fn test_capacity_never_exceeded_and_oldest_evicted() {
        let cache = cache(2000, 3600);
        for i in 0..2001 {
            cache.put(&format!("query {i}"), format!("answer {i}"));
        }
        assert_eq!(cache.len(), 2000);
        // Exactly the oldest insert is gone
        assert!(cache.get("query 0").is_none());
        assert!(cache.get("query 1").is_some());
        assert!(cache.get("query 2000").is_some());
    }

    #[test]
    fn test_overwrite_does_not_evict_and_resets_age() {
        let cache = cache(2, 3600);
        cache.put("a", "1".to_string());
        cache.put("b", "2".to_string());
        // Overwriting "a" makes "b" the oldest write
        cache.put("a", "1b".to_string());
        assert_eq!(cache.len(), 2);

        cache.put("c", "3".to_string());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").unwrap(), "1b");
        assert_eq!(cache.get("c").unwrap(), "3");
    }

    #[test]
    fn test_expired_entry_absent_and_removed() {
        let cache = cache(10, 0); // everything expires immediately
        cache.put("q", "a".to_string());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("q").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_clear() {
        let cache = cache(10, 60);
        cache.put("q", "a".to_string());
        cache.clear();
        assert!(cache.is_empty());
    }
}
