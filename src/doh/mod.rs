pub mod ali;
pub mod google;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::{CacheKey, PositiveCache};
use crate::dns::{DNSPacket, DNSQuestion, DNSResource, DNSResourceType};
use crate::error::{DnsError, Result};

pub use ali::AliDohClient;
pub use google::GoogleDohClient;

/// RRs pulled out of one upstream DoH response, split the way the wire format splits
/// them: `Answer` into `answers`, `Authority` into `authorities`, `Additional` into
/// `additional`. Ali's JSON has no Authority/Additional concept, so `AliDohClient`
/// always returns those two empty.
#[derive(Debug, Default, Clone)]
pub struct DohAnswer {
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub additional: Vec<DNSResource>,
}

/// Shared external role of both DoH variants (spec §4.5): resolve a name/type pair over
/// HTTPS/HTTP and return the RRs it got back. Wire-format specifics live in each variant.
#[async_trait]
pub trait DohClient: Send + Sync {
    async fn resolve(&self, name: &str, qtype: DNSResourceType) -> Result<DohAnswer>;
}

pub(crate) fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Queries `client` for `(name, qtype)`, and on a non-empty answer both caches it (with the
/// `ttl + 10s` grace spec §4.5 calls for) and attempts a non-blocking send of a synthesized
/// reply packet onto `winner_tx`. Shared by the pipeline's race and the refresher's re-query,
/// since spec §4.5's "Post-query action for both" and §4.7 describe the identical caching step.
pub async fn query_and_populate(
    client: &(dyn DohClient),
    cache: &PositiveCache,
    request_id: u16,
    name: &str,
    qtype: DNSResourceType,
    winner_tx: Option<&mpsc::Sender<DNSPacket>>,
) -> Option<Vec<DNSResource>> {
    let answer = match client.resolve(name, qtype).await {
        Ok(answer) if !answer.answers.is_empty() => answer,
        Ok(_) => {
            debug!(name, "DoH query returned an empty answer");
            return None;
        }
        Err(err) => {
            warn!(name, error = %err, "DoH query failed");
            return None;
        }
    };

    // gollum's `ali_doh.go` adds the 10s grace unconditionally, including to a zero TTL
    // answer, rather than falling back to `cacheDefaultTimeout` in that case.
    let grace_ttl = answer.answers[0].ttl + 10;
    let key = CacheKey::new(name, qtype);
    cache.insert(key, answer.answers.clone(), grace_ttl);

    if let Some(tx) = winner_tx {
        let query = DNSPacket::query(request_id, DNSQuestion::new(name, qtype));
        let mut packet = query.response_shell(crate::dns::DNSResponseCode::NoError);
        packet.answers = answer.answers.clone();
        packet.authorities = answer.authorities.clone();
        packet.additional = answer.additional.clone();
        let _ = tx.try_send(packet);
    }

    Some(answer.answers)
}

/// Chooses the preferred variant per spec §4.5/§4.7: Google if a Google upstream IP is
/// configured, Ali otherwise.
pub fn preferred_variant(
    google: Option<Arc<GoogleDohClient>>,
    ali: Option<Arc<AliDohClient>>,
) -> Option<Arc<dyn DohClient>> {
    if let Some(g) = google {
        return Some(g as Arc<dyn DohClient>);
    }
    ali.map(|a| a as Arc<dyn DohClient>)
}

pub(crate) fn parse_ipv4(data: &str) -> Result<std::net::Ipv4Addr> {
    data.parse()
        .map_err(|_| DnsError::Parse(format!("invalid IPv4 literal: {data}")))
}

pub(crate) fn parse_ipv6(data: &str) -> Result<std::net::Ipv6Addr> {
    data.parse()
        .map_err(|_| DnsError::Parse(format!("invalid IPv6 literal: {data}")))
}
