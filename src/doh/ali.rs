use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::dns::{DNSResource, DNSResourceType, RData};
use crate::error::Result;

use super::{now, parse_ipv4, parse_ipv6, DohAnswer, DohClient};

const ALI_UPSTREAM_IP: &str = "203.107.1.33";
const SIGN_HORIZON_SECS: u64 = 86200;
const ALI_HTTP_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct AliResponse {
    host: String,
    #[serde(default)]
    ips: Vec<String>,
    #[serde(default)]
    ipsv6: Vec<String>,
    ttl: u32,
}

pub struct AliDohClient {
    client: reqwest::Client,
    uid: String,
    secret: String,
}

impl AliDohClient {
    pub fn new(uid: impl Into<String>, secret: impl Into<String>) -> Self {
        AliDohClient {
            // Variant A caps its client at a fixed 3s timeout (spec §4.5, §5).
            client: reqwest::Client::builder()
                .timeout(ALI_HTTP_TIMEOUT)
                .build()
                .expect("failed to build reqwest client"),
            uid: uid.into(),
            secret: secret.into(),
        }
    }

    /// `http://203.107.1.33/<UID>/sign_d?host=%s&t=%d&s=%x&query=4,6`, matching
    /// gollum's `AliDoH.GetADoH` template and `utility.GenerateSign` formula exactly.
    fn build_url(&self, host: &str) -> String {
        let t = now() + SIGN_HORIZON_SECS;
        let sign = sign(host, &self.secret, t);
        format!(
            "http://{}/{}/sign_d?host={}&t={}&s={}&query=4,6",
            ALI_UPSTREAM_IP, self.uid, host, t, sign
        )
    }
}

/// `md5hex("<host>-<secret>-<t>")`, lower-case hex — gollum's `GenerateSign`.
fn sign(host: &str, secret: &str, t: u64) -> String {
    let payload = format!("{host}-{secret}-{t}");
    let digest = md5::compute(payload.as_bytes());
    format!("{digest:x}")
}

#[async_trait]
impl DohClient for AliDohClient {
    async fn resolve(&self, name: &str, qtype: DNSResourceType) -> Result<DohAnswer> {
        let url = self.build_url(name);
        let body: AliResponse = self.client.get(&url).send().await?.json().await?;

        let labels = crate::dns::wire::name_to_labels(&body.host);
        let mut records = Vec::new();

        if matches!(qtype, DNSResourceType::A) {
            for ip in &body.ips {
                records.push(DNSResource {
                    labels: labels.clone(),
                    rtype: DNSResourceType::A,
                    rclass: crate::dns::DNSResourceClass::IN,
                    ttl: body.ttl,
                    rdata: RData::A(parse_ipv4(ip)?),
                });
            }
        }

        if matches!(qtype, DNSResourceType::AAAA) {
            for ip in &body.ipsv6 {
                records.push(DNSResource {
                    labels: labels.clone(),
                    rtype: DNSResourceType::AAAA,
                    rclass: crate::dns::DNSResourceClass::IN,
                    ttl: body.ttl,
                    rdata: RData::AAAA(parse_ipv6(ip)?),
                });
            }
        }

        // Ali's sign_d JSON carries no Authority/Additional equivalent.
        Ok(DohAnswer {
            answers: records,
            authorities: Vec::new(),
            additional: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_matches_expected_formula() {
        let digest = sign("example.com", "s3cr3t", 1_700_000_000);
        assert_eq!(digest.len(), 32);
        assert_eq!(digest, sign("example.com", "s3cr3t", 1_700_000_000));
    }

    #[test]
    fn build_url_embeds_uid_and_signature() {
        let client = AliDohClient::new("uid123", "s3cr3t");
        let url = client.build_url("example.com");
        assert!(url.contains("/uid123/sign_d?host=example.com"));
        assert!(url.contains("query=4,6"));
    }
}
