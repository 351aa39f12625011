use serde::Deserialize;

/// Desktop-Chrome user agent sent to the upstream; the web view serves
/// a reduced page to unknown agents.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

/// Main configuration structure for telechan
///
/// Every section is optional; defaults match production use against the
/// real upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Upstream endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the upstream web view (scheme + host)
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent on every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header sent on every request
    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

/// Retry/backoff configuration for transient upstream failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per page fetch, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt (doubles each attempt)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff delay
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Add random jitter on top of each backoff delay
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "0.0.0.0:8080"
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_base_url() -> String {
    "https://t.me".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    "en-GB,en;q=0.9,fr;q=0.8".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_jitter() -> bool {
    true
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}
