use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::dns::{DNSResource, DNSResourceType};
use crate::error::{DnsError, Result};

use super::{parse_ipv4, parse_ipv6, DohAnswer, DohClient};

/// `GET https://dns.google.com/resolve?name=<qname>&type=<qtype>` (spec §4.5, §6).
/// Field names match gollum's `DNSResponseJSON`/`DNSRR` exactly.
#[derive(Debug, Deserialize)]
struct DnsResponseJson {
    #[serde(rename = "Status")]
    status: i32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DnsRr>,
    #[serde(rename = "Authority", default)]
    authority: Vec<DnsRr>,
    #[serde(rename = "Additional", default)]
    additional: Vec<DnsRr>,
}

#[derive(Debug, Deserialize)]
struct DnsRr {
    #[serde(rename = "name")]
    name: String,
    #[serde(rename = "type")]
    rtype: u16,
    #[serde(rename = "TTL")]
    ttl: u32,
    data: String,
}

pub struct GoogleDohClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleDohClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        GoogleDohClient {
            // Variant G uses default client timeout behavior, gated by the pipeline's
            // overall deadline rather than its own fixed timeout (spec §4.5).
            client: reqwest::Client::builder()
                .build()
                .expect("failed to build reqwest client"),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        GoogleDohClient {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build reqwest client"),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl DohClient for GoogleDohClient {
    async fn resolve(&self, name: &str, qtype: DNSResourceType) -> Result<DohAnswer> {
        let qtype_num: u16 = qtype.into();
        let url = format!("{}?name={}&type={}", self.endpoint, name, qtype_num);

        let body: DnsResponseJson = self.client.get(&url).send().await?.json().await?;

        if body.status != 0 {
            return Err(DnsError::Upstream(format!(
                "google DoH returned status {}",
                body.status
            )));
        }

        // spec §9: the original folds `Additional` into the authorities accumulator
        // alongside `Authority`. Not replicated here — each JSON array maps to its own
        // packet section.
        Ok(DohAnswer {
            answers: body.answer.into_iter().map(new_rr).collect::<Result<_>>()?,
            authorities: body.authority.into_iter().map(new_rr).collect::<Result<_>>()?,
            additional: body.additional.into_iter().map(new_rr).collect::<Result<_>>()?,
        })
    }
}

/// Builds an internal RR from a Google-style JSON answer entry: parsed A/AAAA addresses,
/// CNAME target taken verbatim, and anything else kept as RFC 3597 generic raw rdata —
/// matching gollum's `newRR`.
fn new_rr(rr: DnsRr) -> Result<DNSResource> {
    let rtype = DNSResourceType::from(rr.rtype);
    let rdata = match rtype {
        DNSResourceType::A => crate::dns::RData::A(parse_ipv4(&rr.data)?),
        DNSResourceType::AAAA => crate::dns::RData::AAAA(parse_ipv6(&rr.data)?),
        DNSResourceType::CNAME => {
            crate::dns::RData::CNAME(crate::dns::wire::name_to_labels(&rr.data))
        }
        _ => crate::dns::RData::Generic(rr.data.into_bytes()),
    };

    Ok(DNSResource {
        labels: crate::dns::wire::name_to_labels(&rr.name),
        rtype,
        rclass: crate::dns::DNSResourceClass::IN,
        ttl: rr.ttl,
        rdata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_record_from_json_answer() {
        let rr = DnsRr {
            name: "x.".to_string(),
            rtype: 1,
            ttl: 300,
            data: "9.9.9.9".to_string(),
        };
        let resource = new_rr(rr).unwrap();
        assert!(matches!(resource.rdata, crate::dns::RData::A(addr) if addr.to_string() == "9.9.9.9"));
        assert_eq!(resource.ttl, 300);
    }
}
