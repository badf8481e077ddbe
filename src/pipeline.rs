use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, NegativeCache, PositiveCache};
use crate::dns::{DNSPacket, DNSResource, DNSResourceType, DNSResponseCode};
use crate::doh::{self, AliDohClient, DohClient, GoogleDohClient};
use crate::filter::AnswerFilter;
use crate::forward::UDPForwarder;
use crate::hosts::HostsResolver;
use crate::metrics::DnsMetrics;

/// Overall per-query deadline (spec §5, §4.6).
const T_MAX: Duration = Duration::from_secs(1);

/// TTL handed out for static hosts overrides (not otherwise specified by the spec;
/// gollum's hosts answers carry a short fixed TTL since they never expire in practice).
const HOSTS_TTL: u32 = 60;

pub struct RequestPipeline {
    pub hosts: Arc<HostsResolver>,
    pub positive_cache: Arc<PositiveCache>,
    pub negative_cache: Arc<NegativeCache>,
    pub forwarder: Arc<UDPForwarder>,
    pub google: Option<Arc<GoogleDohClient>>,
    pub ali: Option<Arc<AliDohClient>>,
    pub filter: Arc<AnswerFilter>,
    pub with_http_dns: bool,
    /// `T_http`: the HTTP-first deadline, configured via `requestTimeout` (spec §6).
    pub request_timeout: Duration,
    pub metrics: Arc<DnsMetrics>,
}

impl RequestPipeline {
    /// Handles one decoded client query end to end (spec §4.6). Always returns a packet
    /// to write back to the client — SERVFAIL included.
    pub async fn handle(&self, request: DNSPacket) -> DNSPacket {
        let Some(question) = request.questions.first().cloned() else {
            return self.finish(&request, Vec::new(), DNSResponseCode::FormatError);
        };
        let name = question.name();
        let qtype = question.qtype;

        if let Some(reply) = self.try_hosts(&request, &name, qtype) {
            return reply;
        }

        if qtype == DNSResourceType::A {
            if let Some(reply) = self.try_positive_cache(&request, &name) {
                self.metrics.positive_cache_hits.inc();
                return reply;
            }
            self.metrics.positive_cache_misses.inc();
        }

        if qtype == DNSResourceType::AAAA && self.negative_cache.contains(&name) {
            debug!(name, "negative cache hit, returning empty success reply");
            self.metrics.negative_cache_hits.inc();
            return self.finish(&request, Vec::new(), DNSResponseCode::NoError);
        }

        self.race(request, name, qtype).await
    }

    /// Step 1 (spec §4.3, §4.6): static overrides win outright with `aa=1`.
    fn try_hosts(&self, request: &DNSPacket, name: &str, qtype: DNSResourceType) -> Option<DNSPacket> {
        let records = match qtype {
            DNSResourceType::A => self
                .hosts
                .lookup_a(name)
                .into_iter()
                .map(|addr| DNSResource::new_a(name, HOSTS_TTL, addr))
                .collect::<Vec<_>>(),
            DNSResourceType::AAAA => self
                .hosts
                .lookup_aaaa(name)
                .into_iter()
                .map(|addr| DNSResource::new_aaaa(name, HOSTS_TTL, addr))
                .collect::<Vec<_>>(),
            DNSResourceType::PTR => self
                .hosts
                .lookup_ptr(name)
                .into_iter()
                .map(|target| DNSResource::new_ptr(name, HOSTS_TTL, &target))
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };

        if records.is_empty() {
            return None;
        }

        info!(name, "hosts resolver hit");
        self.metrics.hosts_hits.inc();
        let mut reply = self.finish(request, records, DNSResponseCode::NoError);
        reply.header.aa = true;
        Some(reply)
    }

    /// Step 2 (spec §4.1, §4.6): fresh positive-cache entries win, with owner name and
    /// TTL rewritten to reflect the original request and time already elapsed.
    fn try_positive_cache(&self, request: &DNSPacket, name: &str) -> Option<DNSPacket> {
        let key = CacheKey::new(name, DNSResourceType::A);
        let entry = self.positive_cache.get(&key)?;

        let now = epoch_secs();
        let remaining_ttl = entry.expires_at.saturating_sub(now).max(1) as u32;
        let records = entry
            .records
            .iter()
            .map(|rr| DNSResource {
                labels: crate::dns::wire::name_to_labels(name),
                rtype: rr.rtype,
                rclass: rr.rclass,
                ttl: remaining_ttl,
                rdata: rr.rdata.clone(),
            })
            .collect();

        debug!(name, "positive cache hit");
        Some(self.finish(request, records, DNSResponseCode::NoError))
    }

    /// Step 4 (spec §4.6): race UDP against (optionally) one DoH variant.
    async fn race(&self, request: DNSPacket, name: String, qtype: DNSResourceType) -> DNSPacket {
        let start = Instant::now();
        let (udp_tx, mut udp_rx) = mpsc::channel::<DNSPacket>(self.forwarder.proxies().len().max(1));
        let (doh_tx, mut doh_rx) = mpsc::channel::<DNSPacket>(2);

        let forwarder = self.forwarder.clone();
        let query_for_udp = request.clone();
        tokio::spawn(async move {
            if let Err(err) = forwarder.forward(&query_for_udp, udp_tx).await {
                warn!(error = %err, "UDP forwarder failed to dispatch");
            }
        });

        let http_eligible = self.with_http_dns && qtype == DNSResourceType::A;
        if http_eligible {
            if let Some(client) = doh::preferred_variant(self.google.clone(), self.ali.clone()) {
                let cache = self.positive_cache.clone();
                let id = request.header.id;
                let name_for_doh = name.clone();
                tokio::spawn(async move {
                    doh::query_and_populate(&*client, &cache, id, &name_for_doh, qtype, Some(&doh_tx))
                        .await;
                });
            }
        }

        if http_eligible {
            tokio::select! {
                Some(reply) = doh_rx.recv() => {
                    info!(name = %name, "DoH race winner");
                    let variant = if self.google.is_some() { "google" } else { "ali" };
                    self.metrics.doh_wins.with_label_values(&[variant]).inc();
                    // DoH results bypass the blocklist (spec §4.5, §4.8).
                    return self.finish(&request, reply.answers, reply.header.rcode);
                }
                _ = tokio::time::sleep(self.request_timeout) => {
                    debug!(name = %name, "HTTP-first deadline elapsed, falling back to UDP");
                }
            }
        }

        let remaining = T_MAX.saturating_sub(start.elapsed());
        let deadline = tokio::time::sleep(remaining);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                Some(reply) = udp_rx.recv() => {
                    if self.filter.is_blocked(&reply.answers) {
                        warn!(name = %name, "blocklisted reply dropped, continuing to wait");
                        self.metrics.blocklist_drops.inc();
                        continue;
                    }
                    info!(name = %name, "UDP race winner");
                    self.metrics.udp_wins.inc();
                    self.cache_answer(&name, qtype, &reply.answers);
                    return self.finish(&request, reply.answers, reply.header.rcode);
                }
                _ = &mut deadline => {
                    warn!(name = %name, "overall deadline hit, replying SERVFAIL");
                    self.metrics.servfail_replies.inc();
                    if qtype == DNSResourceType::AAAA {
                        self.negative_cache.insert(&name);
                    }
                    return self.finish(&request, Vec::new(), DNSResponseCode::ServerFailure);
                }
            }
        }
    }

    fn cache_answer(&self, name: &str, qtype: DNSResourceType, records: &[DNSResource]) {
        if records.is_empty() {
            return;
        }
        let key = CacheKey::new(name, qtype);
        self.positive_cache.insert(key, records.to_vec(), records[0].ttl);
    }

    /// Step 6 (spec §4.6): clone header id from the request, set qr/ra, preserve the
    /// question section, attach the chosen answers.
    fn finish(&self, request: &DNSPacket, answers: Vec<DNSResource>, rcode: DNSResponseCode) -> DNSPacket {
        let mut reply = request.response_shell(rcode);
        reply.header.ra = request.header.rd;
        reply.answers = answers;
        reply
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
