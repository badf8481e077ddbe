use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::dns::{DNSPacket, DNSQuestion};
use crate::error::{DnsError, Result};
use crate::metrics::DnsMetrics;

const UDP_RECV_TIMEOUT: Duration = Duration::from_secs(5);
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Up,
    Probing,
    Down,
}

/// One upstream UDP resolver with its own failure counter and health state. Grounded on
/// `examples/RoeeJ-heimdall/src/resolver.rs`'s `ServerHealth`, trimmed to the 3-state
/// machine spec §4.4 describes (the teacher also tracks an EMA response time and total
/// request counters this resolver has no use for).
pub struct Proxy {
    pub addr: SocketAddr,
    failures: AtomicU32,
    state: Mutex<ProxyState>,
    tcp_conn: Mutex<Option<TcpStream>>,
}

impl Proxy {
    pub fn new(addr: SocketAddr) -> Self {
        Proxy {
            addr,
            failures: AtomicU32::new(0),
            state: Mutex::new(ProxyState::Up),
            tcp_conn: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> ProxyState {
        *self.state.lock().await
    }

    fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    async fn record_success(&self, metrics: Option<&DnsMetrics>) {
        self.failures.store(0, Ordering::Relaxed);
        let mut state = self.state.lock().await;
        if *state != ProxyState::Up {
            if let Some(metrics) = metrics {
                metrics
                    .proxy_health_transitions
                    .with_label_values(&["up"])
                    .inc();
            }
        }
        *state = ProxyState::Up;
    }

    /// Up -> Probing on the `max_fails`th consecutive failure (spec §4.4).
    async fn record_failure(&self, max_fails: u32, metrics: Option<&DnsMetrics>) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        if max_fails > 0 && failures >= max_fails {
            let mut state = self.state.lock().await;
            if *state == ProxyState::Up {
                *state = ProxyState::Probing;
                debug!(addr = %self.addr, "proxy marked Probing after {failures} consecutive failures");
                if let Some(metrics) = metrics {
                    metrics
                        .proxy_health_transitions
                        .with_label_values(&["probing"])
                        .inc();
                }
            }
        }
    }
}

/// Ordered candidate-list selection policy (spec §4.4): random (default), round-robin,
/// sequential.
pub trait ProxySelector: Send + Sync {
    fn order<'a>(&self, proxies: &'a [Arc<Proxy>]) -> Vec<Arc<Proxy>>;
}

pub struct RandomSelector;

impl ProxySelector for RandomSelector {
    fn order<'a>(&self, proxies: &'a [Arc<Proxy>]) -> Vec<Arc<Proxy>> {
        let mut ordered: Vec<Arc<Proxy>> = proxies.to_vec();
        ordered.shuffle(&mut rand::rng());
        ordered
    }
}

pub struct SequentialSelector;

impl ProxySelector for SequentialSelector {
    fn order<'a>(&self, proxies: &'a [Arc<Proxy>]) -> Vec<Arc<Proxy>> {
        proxies.to_vec()
    }
}

pub struct RoundRobinSelector {
    cursor: AtomicUsize,
}

impl Default for RoundRobinSelector {
    fn default() -> Self {
        RoundRobinSelector {
            cursor: AtomicUsize::new(0),
        }
    }
}

impl ProxySelector for RoundRobinSelector {
    fn order<'a>(&self, proxies: &'a [Arc<Proxy>]) -> Vec<Arc<Proxy>> {
        if proxies.is_empty() {
            return Vec::new();
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % proxies.len();
        proxies
            .iter()
            .cycle()
            .skip(start)
            .take(proxies.len())
            .cloned()
            .collect()
    }
}

/// Fan-out to N upstream UDP resolvers (spec §4.4). `max_fails == 0` disables
/// failure-based skipping entirely.
pub struct UDPForwarder {
    proxies: Vec<Arc<Proxy>>,
    selector: Box<dyn ProxySelector>,
    max_fails: u32,
    metrics: Option<Arc<DnsMetrics>>,
}

impl UDPForwarder {
    pub fn new(addrs: Vec<SocketAddr>, selector: Box<dyn ProxySelector>, max_fails: u32) -> Self {
        UDPForwarder {
            proxies: addrs.into_iter().map(|a| Arc::new(Proxy::new(a))).collect(),
            selector,
            max_fails,
            metrics: None,
        }
    }

    /// Attaches the metrics surface so proxy health transitions get recorded
    /// (`gollum_proxy_health_transitions_total`). Optional — tests construct forwarders
    /// without it.
    pub fn with_metrics(mut self, metrics: Arc<DnsMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn proxies(&self) -> &[Arc<Proxy>] {
        &self.proxies
    }

    /// Launches one concurrent attempt per eligible candidate, each pushing its reply
    /// (if any) onto `winner_tx` with a non-blocking send — a late winner is simply
    /// dropped rather than blocking (spec §4.4, §5, §9).
    pub async fn forward(&self, query: &DNSPacket, winner_tx: mpsc::Sender<DNSPacket>) -> Result<()> {
        if self.proxies.is_empty() {
            return Err(DnsError::NoProxies);
        }

        let candidates: Vec<Arc<Proxy>> = self
            .selector
            .order(&self.proxies)
            .into_iter()
            .filter(|p| self.max_fails == 0 || p.failure_count() < self.max_fails)
            .collect();

        let candidates = if candidates.is_empty() {
            self.selector.order(&self.proxies)
        } else {
            candidates
        };

        let query_bytes = query.to_bytes()?;
        let mut handles = Vec::with_capacity(candidates.len());

        for proxy in candidates {
            let query_clone = query.clone();
            let bytes_clone = query_bytes.clone();
            let tx = winner_tx.clone();
            let max_fails = self.max_fails;
            let metrics = self.metrics.clone();
            handles.push(tokio::spawn(async move {
                attempt(proxy, query_clone, bytes_clone, tx, max_fails, metrics).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        Ok(())
    }

    /// Background health-check loop: probes every `Probing` proxy with a `. IN NS`
    /// query on `hc_interval`, restoring it to `Up` on a successful reply (spec §4.4).
    pub fn spawn_health_checks(self: Arc<Self>, hc_interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(hc_interval);
            loop {
                ticker.tick().await;
                for proxy in self.proxies.clone() {
                    if proxy.state().await != ProxyState::Probing {
                        continue;
                    }
                    if probe(&proxy).await {
                        proxy.record_success(self.metrics.as_deref()).await;
                        debug!(addr = %proxy.addr, "health probe succeeded, proxy back Up");
                    }
                }
            }
        })
    }
}

async fn probe(proxy: &Proxy) -> bool {
    let probe_query = DNSPacket::query(
        rand::random::<u16>(),
        DNSQuestion::new(".", crate::dns::DNSResourceType::NS),
    );
    let Ok(bytes) = probe_query.to_bytes() else {
        return false;
    };
    send_udp(proxy.addr, &bytes, HEALTH_PROBE_TIMEOUT)
        .await
        .is_ok()
}

async fn attempt(
    proxy: Arc<Proxy>,
    query: DNSPacket,
    query_bytes: Vec<u8>,
    winner_tx: mpsc::Sender<DNSPacket>,
    max_fails: u32,
    metrics: Option<Arc<DnsMetrics>>,
) {
    let reply_bytes = match send_udp(proxy.addr, &query_bytes, UDP_RECV_TIMEOUT).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(addr = %proxy.addr, error = %err, "upstream UDP attempt failed");
            proxy.record_failure(max_fails, metrics.as_deref()).await;
            return;
        }
    };

    let reply = match DNSPacket::from_bytes(&reply_bytes) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(addr = %proxy.addr, error = %err, "failed to parse upstream reply");
            proxy.record_failure(max_fails, metrics.as_deref()).await;
            return;
        }
    };

    if reply.header.id != query.header.id || !reply.question_matches(&query) {
        // Reply correctness gate (spec §4.4): log-and-drop, do not penalize the proxy.
        debug!(addr = %proxy.addr, "dropping reply with mismatched id/question (FORMERR)");
        return;
    }

    let reply = if reply.header.tc {
        match retry_tcp(&proxy, &query_bytes).await {
            Ok(tcp_reply) => tcp_reply,
            Err(err) => {
                warn!(addr = %proxy.addr, error = %err, "TCP retry after truncation failed");
                proxy.record_failure(max_fails, metrics.as_deref()).await;
                return;
            }
        }
    } else {
        reply
    };

    proxy.record_success(metrics.as_deref()).await;
    let _ = winner_tx.try_send(reply);
}

async fn send_udp(addr: SocketAddr, query_bytes: &[u8], recv_timeout: Duration) -> Result<Vec<u8>> {
    let local_bind = if addr.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
    let socket = UdpSocket::bind(local_bind).await?;
    socket.connect(addr).await?;
    socket.send(query_bytes).await?;

    let mut buf = vec![0u8; 4096];
    let read = timeout(recv_timeout, socket.recv(&mut buf))
        .await
        .map_err(|_| DnsError::Timeout)??;
    buf.truncate(read);
    Ok(buf)
}

/// Retries the same proxy over TCP on a truncated UDP reply, reusing a cached connection
/// where possible and reconnecting once if the peer had closed it (gollum's
/// `ErrCachedClosed` handling in `forward/forward.go`).
async fn retry_tcp(proxy: &Proxy, query_bytes: &[u8]) -> Result<DNSPacket> {
    let mut guard = proxy.tcp_conn.lock().await;

    if let Some(stream) = guard.as_mut() {
        match send_tcp_query(stream, query_bytes).await {
            Ok(reply) => return DNSPacket::from_bytes(&reply),
            Err(_) => {
                trace!(addr = %proxy.addr, "cached TCP connection closed, reconnecting once");
                *guard = None;
            }
        }
    }

    let mut stream = TcpStream::connect(proxy.addr).await?;
    let reply = send_tcp_query(&mut stream, query_bytes).await?;
    *guard = Some(stream);
    DNSPacket::from_bytes(&reply)
}

async fn send_tcp_query(stream: &mut TcpStream, query_bytes: &[u8]) -> Result<Vec<u8>> {
    let len = query_bytes.len() as u16;
    let mut framed = Vec::with_capacity(2 + query_bytes.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(query_bytes);
    stream.write_all(&framed).await?;

    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let reply_len = u16::from_be_bytes(len_buf) as usize;
    let mut reply = vec![0u8; reply_len];
    stream.read_exact(&mut reply).await?;
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_cycles_through_all_proxies() {
        let proxies: Vec<Arc<Proxy>> = (0..3)
            .map(|i| Arc::new(Proxy::new(format!("127.0.0.1:{}", 5000 + i).parse().unwrap())))
            .collect();
        let selector = RoundRobinSelector::default();
        let first = selector.order(&proxies);
        let second = selector.order(&proxies);
        assert_eq!(first.len(), 3);
        assert_ne!(first[0].addr, second[0].addr);
    }

    #[tokio::test]
    async fn failure_transitions_proxy_to_probing_after_max_fails() {
        let proxy = Proxy::new("127.0.0.1:5353".parse().unwrap());
        proxy.record_failure(2, None).await;
        assert_eq!(proxy.state().await, ProxyState::Up);
        proxy.record_failure(2, None).await;
        assert_eq!(proxy.state().await, ProxyState::Probing);
    }

    #[tokio::test]
    async fn success_resets_failures_and_state() {
        let proxy = Proxy::new("127.0.0.1:5353".parse().unwrap());
        proxy.record_failure(2, None).await;
        proxy.record_failure(2, None).await;
        proxy.record_success(None).await;
        assert_eq!(proxy.state().await, ProxyState::Up);
        assert_eq!(proxy.failure_count(), 0);
    }

    #[tokio::test]
    async fn success_records_a_transition_metric_when_leaving_probing() {
        let metrics = Arc::new(DnsMetrics::new().unwrap());
        let proxy = Proxy::new("127.0.0.1:5353".parse().unwrap());
        proxy.record_failure(1, Some(&metrics)).await;
        assert_eq!(proxy.state().await, ProxyState::Probing);

        proxy.record_success(Some(&metrics)).await;
        let families = metrics.encode();
        assert!(families.contains("gollum_proxy_health_transitions_total"));
    }
}
