use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

const DEFAULT_CONFIG_PATH: &str = "/etc/gollum.config.json";
const GOOGLE_DNS_IP: &str = "8.8.8.8";

/// Mirrors gollum's `utility/config.go` `Config` struct field-for-field (spec §6), loaded
/// from a fixed JSON path. Struct/Default/validate shape follows
/// `examples/RoeeJ-heimdall/src/config.rs`'s `DnsConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub bind_addr: String,
    pub bind_port: u16,
    pub logpath: String,
    pub nsnames: Vec<String>,
    pub request_timeout_ms: u64,
    pub cache_default_timeout_secs: u64,
    /// `PositiveCache` capacity (spec §3: "size ≤ configured capacity, default 100").
    /// Not one of gollum's JSON fields — gollum hardcodes this in `cache.New`.
    pub cache_capacity: usize,
    pub clean_interval_secs: u64,
    pub report_interval_secs: u64,
    pub with_http_dns: bool,
    pub http_dns_server: String,
    pub google_dns_server: String,
    pub google_dns_url: String,
    pub ali_uid: String,
    pub ali_secret_key: String,
    pub region: String,
    pub blacklist_path: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            bind_addr: "0.0.0.0".to_string(),
            bind_port: 1053,
            logpath: String::new(),
            nsnames: vec!["1.1.1.1:53".to_string()],
            request_timeout_ms: 200,
            cache_default_timeout_secs: 300,
            cache_capacity: 100,
            clean_interval_secs: 3600,
            report_interval_secs: 60,
            with_http_dns: false,
            http_dns_server: String::new(),
            google_dns_server: String::new(),
            google_dns_url: "https://dns.google.com/resolve".to_string(),
            ali_uid: String::new(),
            ali_secret_key: String::new(),
            region: String::new(),
            blacklist_path: "./blacklist".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Loads and validates the config file at `path`, falling back to the conventional
    /// fixed path the original used (spec §6). Config load failure is fatal at startup
    /// (spec §7).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH).to_path_buf());

        let contents = fs::read_to_string(&path)
            .map_err(|_| ConfigError::Missing(path.display().to_string()))?;
        let config: ResolverConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nsnames.is_empty() {
            return Err(ConfigError::EmptyUpstreams);
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(self.request_timeout_ms));
        }
        if !self.region.is_empty() && self.region != "na" {
            return Err(ConfigError::InvalidRegion(self.region.clone()));
        }
        self.bind_socket_addr()
            .ok_or_else(|| ConfigError::InvalidBindAddress(self.bind_addr.clone()))?;
        Ok(())
    }

    pub fn bind_socket_addr(&self) -> Option<SocketAddr> {
        self.bind_addr
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.bind_port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_default_timeout_secs)
    }

    /// `region == "na"` sets the Google upstream IP and enables Variant G; otherwise
    /// Variant A (Ali) is chosen (spec §6).
    pub fn google_dns_ip(&self) -> Option<Ipv4Addr> {
        if self.region == "na" {
            Some(GOOGLE_DNS_IP.parse().expect("static literal is valid"))
        } else {
            None
        }
    }

    pub fn upstream_addrs(&self) -> Vec<SocketAddr> {
        self.nsnames
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ResolverConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_upstreams_is_rejected() {
        let mut config = ResolverConfig::default();
        config.nsnames.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyUpstreams)
        ));
    }

    #[test]
    fn region_na_selects_google_dns_ip() {
        let mut config = ResolverConfig::default();
        config.region = "na".to_string();
        assert_eq!(config.google_dns_ip(), Some(GOOGLE_DNS_IP.parse().unwrap()));
    }

    #[test]
    fn invalid_region_is_rejected() {
        let mut config = ResolverConfig::default();
        config.region = "eu".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRegion(_))));
    }
}
