use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{CacheKey, PositiveCache};
use crate::dns::DNSResourceType;
use crate::doh::{self, DohClient};
use crate::metrics::DnsMetrics;

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);
const REFRESH_DEADLINE: Duration = Duration::from_secs(1);

/// Periodic scan of the positive cache that proactively re-resolves expired keys so the
/// next client query hits warm cache (spec §4.7). Grounded on `gollum/janitor.go`'s
/// `ReNewExpired`, translated from its goroutine-per-tick dispatch into a tokio interval
/// loop — heimdall has no equivalent background refresher to ground this on directly.
pub struct Refresher {
    cache: Arc<PositiveCache>,
    doh_client: Arc<dyn DohClient>,
    metrics: Arc<DnsMetrics>,
}

impl Refresher {
    pub fn new(cache: Arc<PositiveCache>, doh_client: Arc<dyn DohClient>, metrics: Arc<DnsMetrics>) -> Self {
        Refresher {
            cache,
            doh_client,
            metrics,
        }
    }

    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }

    /// One pass: snapshot keys frequent-first, peek (non-promoting) each one, and
    /// re-dispatch the expired ones.
    async fn tick(&self) {
        for key in self.cache.keys() {
            let Some((name, qtype)) = split_key(&key) else {
                continue;
            };

            let Some(entry) = self.cache.peek(&key) else {
                continue;
            };
            if !entry.is_expired() {
                continue;
            }

            let cache = self.cache.clone();
            let client = self.doh_client.clone();
            let name_owned = name.clone();
            let metrics = self.metrics.clone();
            tokio::spawn(async move {
                let result = tokio::time::timeout(
                    REFRESH_DEADLINE,
                    doh::query_and_populate(&*client, &cache, 0, &name_owned, qtype, None),
                )
                .await;

                match result {
                    Ok(Some(_)) => {
                        debug!(name = %name_owned, "refresher re-resolved expired entry");
                        metrics.refresher_successes.inc();
                    }
                    Ok(None) => {
                        warn!(name = %name_owned, "refresher got an empty answer");
                        metrics.refresher_failures.inc();
                    }
                    Err(_) => {
                        warn!(name = %name_owned, "refresher deadline elapsed");
                        metrics.refresher_failures.inc();
                    }
                }
            });
        }
    }
}

/// Reverses `CacheKey`'s `"<name>|<qtype>"` format. `CacheKey` deliberately doesn't expose
/// its parts (callers should go through `PositiveCache`), so the refresher — the one
/// caller that genuinely needs the name back out to build a re-query — re-derives it here.
fn split_key(key: &CacheKey) -> Option<(String, DNSResourceType)> {
    let raw = key.as_str();
    let (name, qtype_str) = raw.rsplit_once('|')?;
    let qtype_num: u16 = qtype_str.parse().ok()?;
    Some((name.to_string(), DNSResourceType::from(qtype_num)))
}
