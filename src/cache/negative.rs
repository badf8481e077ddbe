use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tokio::time::interval;
use tracing::debug;

/// Flat TTL set recording names that returned no AAAA answer, so repeat AAAA
/// lookups for the same name short-circuit instead of racing upstream again.
/// Grounded on gollum's `cache.New(20*time.Second, 5*time.Second)` negative cache:
/// fixed TTL, no LRU/2Q behavior, periodic sweep of expired entries.
pub struct NegativeCache {
    entries: DashMap<String, u64>,
    ttl: Duration,
}

impl NegativeCache {
    pub fn new(ttl: Duration) -> Self {
        NegativeCache {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn insert(&self, name: &str) {
        let expires_at = now() + self.ttl.as_secs();
        self.entries.insert(name.to_ascii_lowercase(), expires_at);
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = name.to_ascii_lowercase();
        match self.entries.get(&key) {
            Some(expiry) if *expiry > now() => true,
            Some(_) => {
                drop(self.entries.remove(&key));
                false
            }
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Spawns the background sweep task; callers keep the returned handle so it can be
    /// aborted on shutdown.
    pub fn spawn_sweeper(self: std::sync::Arc<Self>, sweep_interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            loop {
                ticker.tick().await;
                let before = self.entries.len();
                self.entries.retain(|_, expiry| *expiry > now());
                let removed = before - self.entries.len();
                if removed > 0 {
                    debug!(removed, "swept expired negative-cache entries");
                }
            }
        })
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_contains() {
        let cache = NegativeCache::new(Duration::from_secs(20));
        cache.insert("Example.COM");
        assert!(cache.contains("example.com"));
        assert!(!cache.contains("other.com"));
    }
}
