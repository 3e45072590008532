//! Time-boxed LRU storage for rendered responses.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::config::CacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Cached HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// In-process page cache with a fixed time-to-live per entry.
///
/// Concurrent misses on the same key each render and store; the last write
/// wins.
pub struct PageCache {
    entries: RwLock<LruCache<PageKey, Entry>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            ttl: config.ttl,
        }
    }

    pub fn get(&self, key: &PageKey) -> Option<CachedResponse> {
        self.get_at(key, Instant::now())
    }

    /// Lookup as of `now`. Expired entries are dropped on the way out.
    pub fn get_at(&self, key: &PageKey, now: Instant) -> Option<CachedResponse> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.response.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn insert(&self, key: PageKey, response: CachedResponse) {
        self.insert_at(key, response, Instant::now());
    }

    pub fn insert_at(&self, key: PageKey, response: CachedResponse, now: Instant) {
        let entry = Entry {
            response,
            expires_at: now + self.ttl,
        };
        rw_write(&self.entries, SOURCE, "insert").put(key, entry);
    }

    /// Drop every stored response.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn response(body: &'static str) -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: Bytes::from(body),
        }
    }

    #[test]
    fn entry_is_served_until_ttl_elapses() {
        let store = PageCache::new(&CacheConfig::default());
        let key = PageKey::new("index_page", "/");
        let start = Instant::now();

        store.insert_at(key.clone(), response("first"), start);

        let hit = store
            .get_at(&key, start + Duration::from_secs(19))
            .expect("still fresh");
        assert_eq!(hit.body, Bytes::from("first"));

        assert!(store.get_at(&key, start + Duration::from_secs(20)).is_none());
        assert!(store.is_empty(), "expired entry is evicted");
    }

    #[test]
    fn clear_forces_a_miss() {
        let store = PageCache::new(&CacheConfig::default());
        let key = PageKey::new("index_page", "/");

        store.insert(key.clone(), response("first"));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn last_write_wins() {
        let store = PageCache::new(&CacheConfig::default());
        let key = PageKey::new("index_page", "/");

        store.insert(key.clone(), response("first"));
        store.insert(key.clone(), response("second"));

        assert_eq!(store.get(&key).expect("hit").body, Bytes::from("second"));
    }

    #[test]
    fn capacity_bounds_the_store() {
        let config = CacheConfig {
            capacity: 2,
            ..Default::default()
        };
        let store = PageCache::new(&config);

        store.insert(PageKey::new("p", "/a"), response("a"));
        store.insert(PageKey::new("p", "/b"), response("b"));
        store.insert(PageKey::new("p", "/c"), response("c"));

        assert_eq!(store.len(), 2);
        assert!(store.get(&PageKey::new("p", "/a")).is_none());
        assert!(store.get(&PageKey::new("p", "/c")).is_some());
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = PageCache::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.entries.write().expect("lock should be acquired");
            panic!("poison page cache lock");
        }));

        store.insert(PageKey::new("p", "/"), response("ok"));
        assert!(store.get(&PageKey::new("p", "/")).is_some());
    }
}
