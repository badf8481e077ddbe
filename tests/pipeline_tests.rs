use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use fleetdns::cache::{CacheKey, NegativeCache, PositiveCache};
use fleetdns::dns::{DNSPacket, DNSQuestion, DNSResource, DNSResourceType, DNSResponseCode};
use fleetdns::filter::AnswerFilter;
use fleetdns::forward::{RandomSelector, UDPForwarder};
use fleetdns::hosts::HostsResolver;
use fleetdns::metrics::DnsMetrics;
use fleetdns::pipeline::RequestPipeline;
use tokio::net::UdpSocket;

async fn fake_upstream(answer_ip: Ipv4Addr) -> std::net::SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let mut buf = vec![0u8; 512];
            let Ok((read, from)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let Ok(query) = DNSPacket::from_bytes(&buf[..read]) else {
                continue;
            };
            let name = query.questions[0].name();
            let mut reply = query.response_shell(DNSResponseCode::NoError);
            reply.answers = vec![DNSResource::new_a(&name, 30, answer_ip)];
            let _ = socket.send_to(&reply.to_bytes().unwrap(), from).await;
        }
    });
    addr
}

fn pipeline_with_forwarder(forwarder: Arc<UDPForwarder>) -> RequestPipeline {
    RequestPipeline {
        hosts: Arc::new(HostsResolver::default()),
        positive_cache: Arc::new(PositiveCache::new(64)),
        negative_cache: Arc::new(NegativeCache::new(Duration::from_secs(20))),
        forwarder,
        google: None,
        ali: None,
        filter: Arc::new(AnswerFilter::default()),
        with_http_dns: false,
        request_timeout: Duration::from_millis(200),
        metrics: Arc::new(DnsMetrics::new().unwrap()),
    }
}

#[tokio::test]
async fn hosts_override_wins_with_authoritative_flag() {
    // Map keys are dot-less, matching the form `question.name()` produces (wire names
    // round-trip through `name_to_labels`/`labels_to_name`, which never carry a trailing
    // dot) — see `main.rs`'s `load_hosts_file`.
    let mut v4 = std::collections::HashMap::new();
    v4.insert(
        "router.lan".to_string(),
        vec![Ipv4Addr::new(192, 168, 1, 1)],
    );
    let hosts = Arc::new(HostsResolver::new(
        v4,
        std::collections::HashMap::new(),
        std::collections::HashMap::new(),
    ));

    let forwarder = Arc::new(UDPForwarder::new(Vec::new(), Box::new(RandomSelector), 3));
    let mut pipeline = pipeline_with_forwarder(forwarder);
    pipeline.hosts = hosts;

    let request = DNSPacket::query(1, DNSQuestion::new("router.lan.", DNSResourceType::A));
    let reply = pipeline.handle(request).await;

    assert!(reply.header.aa);
    assert_eq!(reply.answers.len(), 1);
}

#[tokio::test]
async fn udp_race_winner_populates_the_positive_cache() {
    let upstream_addr = fake_upstream(Ipv4Addr::new(203, 0, 113, 42)).await;
    let forwarder = Arc::new(UDPForwarder::new(
        vec![upstream_addr],
        Box::new(RandomSelector),
        3,
    ));
    let pipeline = pipeline_with_forwarder(forwarder);

    let request = DNSPacket::query(9, DNSQuestion::new("race.example.com.", DNSResourceType::A));
    let reply = pipeline.handle(request).await;

    assert_eq!(reply.header.rcode, DNSResponseCode::NoError);
    assert_eq!(reply.answers.len(), 1);

    let key = CacheKey::new("race.example.com", DNSResourceType::A);
    assert!(pipeline.positive_cache.peek(&key).is_some());
}

#[tokio::test]
async fn blocklisted_udp_answers_are_dropped_and_time_out_to_servfail() {
    let upstream_addr = fake_upstream(Ipv4Addr::new(6, 6, 6, 6)).await;
    let forwarder = Arc::new(UDPForwarder::new(
        vec![upstream_addr],
        Box::new(RandomSelector),
        3,
    ));
    let mut pipeline = pipeline_with_forwarder(forwarder);
    pipeline.filter = Arc::new(AnswerFilter::from_text("6.6.6.6\n"));

    let request = DNSPacket::query(3, DNSQuestion::new("blocked.example.com.", DNSResourceType::A));
    let reply = pipeline.handle(request).await;

    assert_eq!(reply.header.rcode, DNSResponseCode::ServerFailure);
    assert!(reply.answers.is_empty());
}
