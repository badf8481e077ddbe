use std::net::Ipv4Addr;
use std::time::Duration;

use fleetdns::cache::{CacheKey, NegativeCache, PositiveCache};
use fleetdns::dns::{DNSResource, DNSResourceType};

fn a_records(name: &str, ttl: u32) -> Vec<DNSResource> {
    vec![DNSResource::new_a(name, ttl, Ipv4Addr::new(203, 0, 113, 7))]
}

#[test]
fn positive_cache_insert_uses_default_ttl_when_answer_ttl_is_zero() {
    let cache = PositiveCache::with_default_ttl(16, 120);
    let key = CacheKey::new("zero-ttl.example.com", DNSResourceType::A);
    cache.insert(key.clone(), a_records("zero-ttl.example.com", 0), 0);

    let entry = cache.peek(&key).expect("entry should be present");
    assert!(!entry.is_expired());
}

#[test]
fn positive_cache_distinguishes_record_types_for_the_same_name() {
    let cache = PositiveCache::new(16);
    let a_key = CacheKey::new("dual.example.com", DNSResourceType::A);
    let aaaa_key = CacheKey::new("dual.example.com", DNSResourceType::AAAA);

    cache.insert(a_key.clone(), a_records("dual.example.com", 300), 300);
    assert!(cache.peek(&a_key).is_some());
    assert!(cache.peek(&aaaa_key).is_none());
}

#[test]
fn negative_cache_entries_self_expire() {
    let cache = NegativeCache::new(Duration::from_millis(10));
    cache.insert("blackhole.example.com");
    assert!(cache.contains("blackhole.example.com"));

    std::thread::sleep(Duration::from_millis(30));
    assert!(!cache.contains("blackhole.example.com"));
}
