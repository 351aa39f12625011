use std::net::SocketAddr;

use url::Url;

use crate::config::types::Config;
use crate::ConfigError;

/// Validates a parsed configuration
///
/// Checks that values the rest of the system assumes are well-formed
/// actually are, so failures surface at startup rather than mid-request.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let base = Url::parse(&config.upstream.base_url)
        .map_err(|e| ConfigError::Validation(format!("upstream.base-url: {}", e)))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "upstream.base-url must be http(s), got scheme {:?}",
            base.scheme()
        )));
    }
    if base.host_str().is_none() {
        return Err(ConfigError::Validation(
            "upstream.base-url has no host".to_string(),
        ));
    }

    if config.upstream.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "upstream.request-timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.retry.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "retry.max-attempts must be at least 1".to_string(),
        ));
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry.base-delay-ms ({}) exceeds retry.max-delay-ms ({})",
            config.retry.base_delay_ms, config.retry.max_delay_ms
        )));
    }

    config
        .server
        .bind
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::Validation(format!("server.bind: {}", e)))?;

    Ok(())
}
