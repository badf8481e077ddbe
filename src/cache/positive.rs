use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use crate::dns::{DNSResource, DNSResourceType};

/// `"<lowercased name>|<qtype>"`, matching gollum's `DNSRecorder` key format so the
/// same domain queried for different record types never collides.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(name: &str, qtype: DNSResourceType) -> Self {
        let raw: u16 = qtype.into();
        CacheKey(format!("{}|{}", name.to_ascii_lowercase(), raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub records: Vec<DNSResource>,
    pub expires_at: u64,
}

impl CacheEntry {
    pub fn new(records: Vec<DNSResource>, ttl_secs: u64) -> Self {
        CacheEntry {
            records,
            expires_at: now() + ttl_secs,
        }
    }

    pub fn is_expired(&self) -> bool {
        now() >= self.expires_at
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// True 2Q positive-answer cache: a small "recent" queue for entries seen once and a
/// larger "frequent" queue for entries that have been hit again. Grounded on the
/// segmented-LRU split in `cache::slru`, but reworked so eviction always drains the
/// recent queue before touching the frequent one, and `peek` never promotes — the
/// refresher (`refresher.rs`) needs to walk every key without disturbing ordering.
pub struct PositiveCache {
    recent: DashMap<CacheKey, CacheEntry>,
    frequent: DashMap<CacheKey, CacheEntry>,
    recent_order: Mutex<VecDeque<CacheKey>>,
    frequent_order: Mutex<VecDeque<CacheKey>>,
    recent_capacity: usize,
    frequent_capacity: usize,
    /// `cacheDefaultTimeout` (spec §6): used in place of an answer's own TTL whenever
    /// that TTL is `<= 0` at insertion (spec §3).
    default_ttl_secs: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PositiveCache {
    pub fn new(capacity: usize) -> Self {
        Self::with_default_ttl(capacity, 300)
    }

    pub fn with_default_ttl(capacity: usize, default_ttl_secs: u64) -> Self {
        let recent_capacity = (capacity / 4).max(1);
        let frequent_capacity = capacity.saturating_sub(recent_capacity).max(1);
        PositiveCache {
            recent: DashMap::new(),
            frequent: DashMap::new(),
            recent_order: Mutex::new(VecDeque::new()),
            frequent_order: Mutex::new(VecDeque::new()),
            recent_capacity,
            frequent_capacity,
            default_ttl_secs,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Builds a `CacheEntry` from `records`/`ttl`, substituting `cacheDefaultTimeout`
    /// when `ttl == 0`, and stores it (spec §3 `set(records, ttl, qtype)`).
    pub fn insert(&self, key: CacheKey, records: Vec<DNSResource>, ttl: u32) {
        let ttl_secs = if ttl > 0 {
            ttl as u64
        } else {
            self.default_ttl_secs
        };
        self.set(key, CacheEntry::new(records, ttl_secs));
    }

    pub fn set(&self, key: CacheKey, entry: CacheEntry) {
        if self.frequent.contains_key(&key) {
            self.frequent.insert(key.clone(), entry);
            self.touch_frequent(&key);
            return;
        }
        if self.recent.contains_key(&key) {
            self.recent.insert(key, entry);
            return;
        }

        self.recent.insert(key.clone(), entry);
        let mut order = self.recent_order.lock();
        order.push_back(key);
        while order.len() > self.recent_capacity {
            if let Some(evicted) = order.pop_front() {
                self.recent.remove(&evicted);
                trace!(key = %evicted.0, "evicted from recent queue");
            }
        }
    }

    /// Looks a key up, promoting a fresh recent-queue hit into the frequent queue.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        if let Some(entry) = self.frequent.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.frequent.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            let value = entry.clone();
            drop(entry);
            self.touch_frequent(key);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }

        if let Some(entry) = self.recent.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.recent.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            let value = entry.clone();
            drop(entry);
            self.promote(key.clone(), value.clone());
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Reads a key without promoting it — used by the refresher so a scan pass
    /// doesn't itself disturb 2Q ordering.
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.frequent
            .get(key)
            .map(|e| e.clone())
            .or_else(|| self.recent.get(key).map(|e| e.clone()))
    }

    pub fn delete(&self, key: &CacheKey) {
        self.frequent.remove(key);
        self.recent.remove(key);
    }

    /// Frequent keys first, then recent — matches the order the refresher should
    /// prioritize re-resolution in (hot entries first).
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.frequent_order.lock().iter().cloned().collect();
        keys.extend(self.recent_order.lock().iter().cloned());
        keys
    }

    pub fn count(&self) -> usize {
        self.frequent.len() + self.recent.len()
    }

    pub fn flush(&self) {
        self.frequent.clear();
        self.recent.clear();
        self.frequent_order.lock().clear();
        self.recent_order.lock().clear();
    }

    fn promote(&self, key: CacheKey, entry: CacheEntry) {
        self.recent.remove(&key);
        {
            let mut recent_order = self.recent_order.lock();
            recent_order.retain(|k| k != &key);
        }

        self.frequent.insert(key.clone(), entry);
        let mut frequent_order = self.frequent_order.lock();
        frequent_order.push_back(key);
        while frequent_order.len() > self.frequent_capacity {
            if let Some(demoted) = frequent_order.pop_front() {
                if let Some((_, value)) = self.frequent.remove(&demoted) {
                    self.recent.insert(demoted.clone(), value);
                    self.recent_order.lock().push_back(demoted);
                }
            }
        }
    }

    fn touch_frequent(&self, key: &CacheKey) {
        let mut order = self.frequent_order.lock();
        order.retain(|k| k != key);
        order.push_back(key.clone());
    }
}

impl Default for PositiveCache {
    fn default() -> Self {
        PositiveCache::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn entry() -> CacheEntry {
        CacheEntry::new(
            vec![DNSResource::new_a("example.com", 300, Ipv4Addr::new(1, 1, 1, 1))],
            300,
        )
    }

    #[test]
    fn fresh_hit_promotes_from_recent_to_frequent() {
        let cache = PositiveCache::new(20);
        let key = CacheKey::new("example.com", DNSResourceType::A);
        cache.set(key.clone(), entry());

        assert!(cache.get(&key).is_some());
        assert!(cache.frequent.contains_key(&key));
        assert!(!cache.recent.contains_key(&key));
    }

    #[test]
    fn eviction_drains_recent_before_frequent() {
        let cache = PositiveCache::new(20);
        let frequent_key = CacheKey::new("hot.example.com", DNSResourceType::A);
        cache.set(frequent_key.clone(), entry());
        cache.get(&frequent_key); // promote to frequent

        for i in 0..10 {
            let key = CacheKey::new(&format!("cold{i}.example.com"), DNSResourceType::A);
            cache.set(key, entry());
        }

        assert!(cache.peek(&frequent_key).is_some());
    }

    #[test]
    fn peek_does_not_promote() {
        let cache = PositiveCache::new(20);
        let key = CacheKey::new("example.com", DNSResourceType::A);
        cache.set(key.clone(), entry());

        cache.peek(&key);
        assert!(cache.recent.contains_key(&key));
        assert!(!cache.frequent.contains_key(&key));
    }
}
