use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use fleetdns::dns::{DNSPacket, DNSQuestion, DNSResource, DNSResourceType, DNSResponseCode};
use fleetdns::forward::{RandomSelector, UDPForwarder};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Binds a fake upstream that answers every query with a single A record, then confirms
/// `UDPForwarder::forward` delivers the parsed reply onto the winner channel.
#[tokio::test]
async fn forward_delivers_a_reply_from_a_single_proxy() {
    let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = upstream.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        let (read, from) = upstream.recv_from(&mut buf).await.unwrap();
        let query = DNSPacket::from_bytes(&buf[..read]).unwrap();
        let mut reply = query.response_shell(DNSResponseCode::NoError);
        reply.answers = vec![DNSResource::new_a(
            "race.example.com",
            30,
            Ipv4Addr::new(198, 51, 100, 9),
        )];
        upstream.send_to(&reply.to_bytes().unwrap(), from).await.unwrap();
    });

    let forwarder = Arc::new(UDPForwarder::new(
        vec![upstream_addr],
        Box::new(RandomSelector),
        3,
    ));

    let query = DNSPacket::query(42, DNSQuestion::new("race.example.com", DNSResourceType::A));
    let (tx, mut rx) = mpsc::channel(1);
    forwarder.forward(&query, tx).await.unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("forwarder should deliver a reply before the test timeout")
        .expect("channel should not be closed without a reply");

    assert_eq!(reply.header.id, 42);
    assert_eq!(reply.answers.len(), 1);
}

#[tokio::test]
async fn forward_with_no_proxies_errors() {
    let forwarder = UDPForwarder::new(Vec::new(), Box::new(RandomSelector), 3);
    let query = DNSPacket::query(1, DNSQuestion::new("example.com", DNSResourceType::A));
    let (tx, _rx) = mpsc::channel(1);
    assert!(forwarder.forward(&query, tx).await.is_err());
}
