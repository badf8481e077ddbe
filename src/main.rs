use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures::FutureExt;
use fleetdns::cache::{NegativeCache, PositiveCache};
use fleetdns::config::ResolverConfig;
use fleetdns::doh::{AliDohClient, DohClient, GoogleDohClient};
use fleetdns::dns::DNSPacket;
use fleetdns::filter::AnswerFilter;
use fleetdns::forward::{RandomSelector, UDPForwarder};
use fleetdns::graceful_shutdown::GracefulShutdown;
use fleetdns::hosts::HostsResolver;
use fleetdns::http_server::HttpServer;
use fleetdns::metrics::DnsMetrics;
use fleetdns::pipeline::RequestPipeline;
use fleetdns::refresher::Refresher;
use tokio::net::UdpSocket;
use tracing::{error, info, warn};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(500);
const MAX_CONSECUTIVE_FAILS: u32 = 3;
const NEGATIVE_CACHE_TTL: Duration = Duration::from_secs(20);
const NEGATIVE_CACHE_SWEEP: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "fleetdns", about = "Caching, racing recursive DNS resolver")]
struct Args {
    /// Path to the JSON config file (defaults to /etc/gollum.config.json).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the hosts file path read at startup (defaults to /etc/hosts).
    #[arg(long)]
    hosts_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ResolverConfig::load(args.config.as_deref())?;

    let hosts_path = args
        .hosts_file
        .unwrap_or_else(|| PathBuf::from("/etc/hosts"));
    let hosts = Arc::new(load_hosts_file(&hosts_path));

    let shutdown = Arc::new(GracefulShutdown::new());
    let metrics = Arc::new(DnsMetrics::new()?);

    let positive_cache = Arc::new(PositiveCache::with_default_ttl(
        config.cache_capacity,
        config.cache_default_timeout_secs,
    ));
    let negative_cache = Arc::new(NegativeCache::new(NEGATIVE_CACHE_TTL));
    let sweeper_handle = negative_cache.clone().spawn_sweeper(NEGATIVE_CACHE_SWEEP);
    register_background_task(&shutdown, "negative-cache-sweeper", sweeper_handle).await;

    let forwarder = Arc::new(
        UDPForwarder::new(
            config.upstream_addrs(),
            Box::new(RandomSelector),
            MAX_CONSECUTIVE_FAILS,
        )
        .with_metrics(metrics.clone()),
    );
    let health_check_handle = forwarder.clone().spawn_health_checks(HEALTH_CHECK_INTERVAL);
    register_background_task(&shutdown, "proxy-health-checks", health_check_handle).await;

    let google = config
        .google_dns_ip()
        .map(|_| Arc::new(GoogleDohClient::new(config.google_dns_url.clone())));
    let ali = if !config.ali_uid.is_empty() {
        Some(Arc::new(AliDohClient::new(
            config.ali_uid.clone(),
            config.ali_secret_key.clone(),
        )))
    } else {
        None
    };

    let filter = Arc::new(load_blacklist(&config.blacklist_path));

    let pipeline = Arc::new(RequestPipeline {
        hosts: hosts.clone(),
        positive_cache: positive_cache.clone(),
        negative_cache: negative_cache.clone(),
        forwarder: forwarder.clone(),
        google: google.clone(),
        ali: ali.clone(),
        filter: filter.clone(),
        with_http_dns: config.with_http_dns,
        request_timeout: config.request_timeout(),
        metrics: metrics.clone(),
    });

    if let Some(refresh_client) = refresher_client(&google, &ali) {
        let refresher = Arc::new(Refresher::new(
            positive_cache.clone(),
            refresh_client,
            metrics.clone(),
        ));
        let refresher_handle = refresher.spawn();
        register_background_task(&shutdown, "refresher", refresher_handle).await;
    } else {
        info!("no DoH variant configured, refresher disabled");
    }

    let bind_addr = config
        .bind_socket_addr()
        .expect("config was validated at load time");
    let metrics_addr = std::net::SocketAddr::new(bind_addr.ip(), config.bind_port + 1);

    let http_server = HttpServer::new(metrics.clone(), metrics_addr);
    let http_server_handle = tokio::spawn(async move {
        if let Err(err) = http_server.serve().await {
            error!(error = %err, "metrics/health HTTP server exited");
        }
    });
    register_background_task(&shutdown, "metrics-http-server", http_server_handle).await;

    let udp_shutdown_rx = shutdown.subscribe();
    let server_handle = tokio::spawn(run_udp_server(bind_addr, pipeline, udp_shutdown_rx));

    wait_for_shutdown_signal().await;
    shutdown.shutdown().await?;
    let _ = server_handle.await;

    Ok(())
}

/// Registers a spawned background loop with `shutdown` so `GracefulShutdown::shutdown`
/// actually drains it instead of leaving the task running past process exit. These loops
/// have no internal stop signal of their own, so "shutdown" means abort — `JoinHandle::abort`
/// takes effect at the task's next await point, which is immediate for the tick-sleep loops
/// spawned here.
async fn register_background_task(
    shutdown: &GracefulShutdown,
    name: &str,
    handle: tokio::task::JoinHandle<()>,
) {
    let handle = Arc::new(handle);
    shutdown
        .register_component(name.to_string(), move || {
            let handle = handle.clone();
            async move {
                handle.abort();
                Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
            }
        })
        .await;
}

fn refresher_client(
    google: &Option<Arc<GoogleDohClient>>,
    ali: &Option<Arc<AliDohClient>>,
) -> Option<Arc<dyn DohClient>> {
    if let Some(g) = google {
        return Some(g.clone() as Arc<dyn DohClient>);
    }
    ali.clone().map(|a| a as Arc<dyn DohClient>)
}

/// UDP server loop (spec §2, §4): bind, receive, decode, dispatch to the pipeline, reply.
/// A panicking query handler is caught so one malformed packet can't take the process down
/// (ambient error-handling concern per SPEC_FULL.md §A.2), grounded on
/// `examples/RoeeJ-heimdall/src/server.rs`'s `run_udp_server` shutdown-select loop.
async fn run_udp_server(
    bind_addr: std::net::SocketAddr,
    pipeline: Arc<RequestPipeline>,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
    info!(addr = %bind_addr, "DNS server listening");

    let mut buf = vec![0u8; 4096];
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("UDP server received shutdown signal");
                return Ok(());
            }
            result = socket.recv_from(&mut buf) => {
                let (read, from) = result?;
                let query_bytes = buf[..read].to_vec();
                let pipeline = pipeline.clone();
                let socket = socket.clone();

                tokio::spawn(async move {
                    let request = match DNSPacket::from_bytes(&query_bytes) {
                        Ok(request) => request,
                        Err(err) => {
                            warn!(%from, error = %err, "dropping malformed query");
                            return;
                        }
                    };

                    let reply = match std::panic::AssertUnwindSafe(pipeline.handle(request))
                        .catch_unwind()
                        .await
                    {
                        Ok(reply) => reply,
                        Err(_) => {
                            error!(%from, "query handler panicked, dropping query");
                            return;
                        }
                    };

                    match reply.to_bytes() {
                        Ok(bytes) => {
                            if let Err(err) = socket.send_to(&bytes, from).await {
                                error!(%from, error = %err, "failed to send reply");
                            }
                        }
                        Err(err) => error!(%from, error = %err, "failed to serialize reply"),
                    }
                });
            }
        }
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tokio::select! {
        _ = &mut ctrl_c => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}

/// `/etc/hosts`-style loader feeding `HostsResolver` (spec §9 "analogous to gollum's
/// `readHosts`"): `<address> <name> [alias...]`, `#`-comments, blank lines skipped.
/// Also populates the PTR reverse map the way `hosts.go`'s `hmap.addPTR` does. Map keys
/// are built in the same dot-less form `wire::name_to_labels`/`labels_to_name` round-trip
/// a query name through (`pipeline.rs`'s `try_hosts` looks names up that way), so a
/// trailing dot here or there never prevents a match.
fn load_hosts_file(path: &Path) -> HostsResolver {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "no hosts file loaded");
            return HostsResolver::default();
        }
    };

    let mut v4: HashMap<String, Vec<Ipv4Addr>> = HashMap::new();
    let mut v6: HashMap<String, Vec<Ipv6Addr>> = HashMap::new();
    let mut ptr: HashMap<String, Vec<String>> = HashMap::new();

    for line in contents.lines() {
        let line = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let Some(addr_field) = fields.next() else {
            continue;
        };
        let names: Vec<&str> = fields.collect();
        if names.is_empty() {
            continue;
        }

        if let Ok(addr) = addr_field.parse::<Ipv4Addr>() {
            let reverse = reverse_dns_name_v4(addr);
            for name in &names {
                let fqdn = fqdn(name);
                v4.entry(fqdn.clone()).or_default().push(addr);
                ptr.entry(reverse.clone()).or_default().push(fqdn);
            }
        } else if let Ok(addr) = addr_field.parse::<Ipv6Addr>() {
            for name in &names {
                let fqdn = fqdn(name);
                v6.entry(fqdn).or_default().push(addr);
            }
        }
    }

    info!(path = %path.display(), entries = v4.len() + v6.len(), "loaded hosts file");
    HostsResolver::new(v4, v6, ptr)
}

fn fqdn(name: &str) -> String {
    name.to_ascii_lowercase()
        .trim_end_matches('.')
        .to_string()
}

fn reverse_dns_name_v4(addr: Ipv4Addr) -> String {
    let [a, b, c, d] = addr.octets();
    format!("{d}.{c}.{b}.{a}.in-addr.arpa")
}

fn load_blacklist(path: &str) -> AnswerFilter {
    match std::fs::read_to_string(path) {
        Ok(contents) => AnswerFilter::from_text(&contents),
        Err(err) => {
            warn!(path, error = %err, "no blacklist file loaded");
            AnswerFilter::default()
        }
    }
}
