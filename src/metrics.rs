use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus counters standing in for gollum's StatsD calls (`hosts_hit`, `Pcache_hit`,
/// `Ncache_hit`, `http_hit`, `edns_hit`, `has_respondes`) — ambient observability carried
/// regardless of the spec's silence on metrics (the spec's Non-goals scope functionality,
/// not ambient concerns). Struct/registration shape grounded on
/// `examples/RoeeJ-heimdall/src/metrics.rs`'s `DnsMetrics`, trimmed to what this resolver's
/// components actually emit.
pub struct DnsMetrics {
    registry: Registry,
    pub hosts_hits: IntCounter,
    pub positive_cache_hits: IntCounter,
    pub positive_cache_misses: IntCounter,
    pub negative_cache_hits: IntCounter,
    pub doh_wins: IntCounterVec,
    pub udp_wins: IntCounter,
    pub servfail_replies: IntCounter,
    pub blocklist_drops: IntCounter,
    pub proxy_health_transitions: IntCounterVec,
    pub refresher_successes: IntCounter,
    pub refresher_failures: IntCounter,
}

impl DnsMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let hosts_hits = IntCounter::with_opts(Opts::new(
            "gollum_hosts_hits_total",
            "queries answered from the static hosts table",
        ))?;
        let positive_cache_hits = IntCounter::with_opts(Opts::new(
            "gollum_positive_cache_hits_total",
            "queries answered from the positive cache",
        ))?;
        let positive_cache_misses = IntCounter::with_opts(Opts::new(
            "gollum_positive_cache_misses_total",
            "A queries that missed the positive cache",
        ))?;
        let negative_cache_hits = IntCounter::with_opts(Opts::new(
            "gollum_negative_cache_hits_total",
            "AAAA queries answered from the negative cache",
        ))?;
        let doh_wins = IntCounterVec::new(
            Opts::new("gollum_doh_wins_total", "races won by a DoH variant"),
            &["variant"],
        )?;
        let udp_wins = IntCounter::with_opts(Opts::new(
            "gollum_udp_wins_total",
            "races won by the UDP forwarder",
        ))?;
        let servfail_replies = IntCounter::with_opts(Opts::new(
            "gollum_servfail_total",
            "queries answered SERVFAIL after the overall deadline",
        ))?;
        let blocklist_drops = IntCounter::with_opts(Opts::new(
            "gollum_blocklist_drops_total",
            "upstream replies dropped by the answer filter",
        ))?;
        let proxy_health_transitions = IntCounterVec::new(
            Opts::new(
                "gollum_proxy_health_transitions_total",
                "upstream proxy health state transitions",
            ),
            &["state"],
        )?;
        let refresher_successes = IntCounter::with_opts(Opts::new(
            "gollum_refresher_successes_total",
            "expired cache entries the refresher re-resolved successfully",
        ))?;
        let refresher_failures = IntCounter::with_opts(Opts::new(
            "gollum_refresher_failures_total",
            "refresher re-resolutions that failed or timed out",
        ))?;

        registry.register(Box::new(hosts_hits.clone()))?;
        registry.register(Box::new(positive_cache_hits.clone()))?;
        registry.register(Box::new(positive_cache_misses.clone()))?;
        registry.register(Box::new(negative_cache_hits.clone()))?;
        registry.register(Box::new(doh_wins.clone()))?;
        registry.register(Box::new(udp_wins.clone()))?;
        registry.register(Box::new(servfail_replies.clone()))?;
        registry.register(Box::new(blocklist_drops.clone()))?;
        registry.register(Box::new(proxy_health_transitions.clone()))?;
        registry.register(Box::new(refresher_successes.clone()))?;
        registry.register(Box::new(refresher_failures.clone()))?;

        Ok(DnsMetrics {
            registry,
            hosts_hits,
            positive_cache_hits,
            positive_cache_misses,
            negative_cache_hits,
            doh_wins,
            udp_wins,
            servfail_replies,
            blocklist_drops,
            proxy_health_transitions,
            refresher_successes,
            refresher_failures,
        })
    }

    pub fn encode(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .expect("prometheus encoding is infallible for well-formed metrics");
        String::from_utf8(buffer).expect("prometheus text output is always valid UTF-8")
    }
}

impl Default for DnsMetrics {
    fn default() -> Self {
        Self::new().expect("metric registration should not collide")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_prometheus_text() {
        let metrics = DnsMetrics::new().unwrap();
        metrics.hosts_hits.inc();
        let text = metrics.encode();
        assert!(text.contains("gollum_hosts_hits_total"));
    }
}
