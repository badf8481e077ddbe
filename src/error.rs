use thiserror::Error;

pub type Result<T> = std::result::Result<T, DnsError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing config file: {0}")]
    Missing(String),
    #[error("invalid JSON in config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("empty upstream nameserver list")]
    EmptyUpstreams,
    #[error("invalid request timeout: {0}")]
    InvalidTimeout(u64),
    #[error("invalid region {0:?}, expected \"na\" or empty")]
    InvalidRegion(String),
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),
}

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse DNS wire format: {0}")]
    Parse(String),

    #[error("upstream query timed out")]
    Timeout,

    #[error("upstream transport error: {0}")]
    Upstream(String),

    #[error("DoH transport error: {0}")]
    Doh(#[from] reqwest::Error),

    #[error("DoH response was not valid JSON: {0}")]
    DohJson(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("no proxies configured")]
    NoProxies,

    #[error("reply did not match the question that was sent")]
    Mismatch,

    #[error("server is shutting down")]
    ServerShutdown,
}
