//! HTTP fetcher for upstream channel pages
//!
//! One GET per attempt against a caller-templated URL, with bounded
//! retry and error classification:
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Return body |
//! | HTTP 404 | Immediate `NotFound`, no retry |
//! | Other status | Retry with backoff |
//! | Timeout / connection error | Retry with backoff |
//!
//! A 404 on the channel root is a definitive signal that the handle does
//! not resolve to a public channel, so retrying it would only burn
//! requests against a rate-limited third party.

use std::time::Duration;

use rand::Rng;
use reqwest::{header, Client, StatusCode};
use thiserror::Error;

use crate::config::{RetryConfig, UpstreamConfig};

/// Fetch-level failure, classified for the caller
#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream answered 404; not retried
    #[error("Upstream returned 404 for {url}")]
    NotFound { url: String },

    /// All retry attempts failed with transient errors
    #[error("Giving up on {url} after {attempts} attempt(s): {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// Explicit retry policy consumed by [`fetch_page`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt
    pub base_delay: Duration,
    /// Upper bound on a single delay
    pub max_delay: Duration,
    /// Add random jitter (up to half the base delay) to each sleep
    pub jitter: bool,
}

impl RetryPolicy {
    /// Backoff before attempt `attempt + 1`, given that `attempt`
    /// (1-based) just failed: `base * 2^(attempt-1)`, capped at
    /// `max_delay`. Pure; jitter is added at the sleep site.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    fn sleep_duration(&self, attempt: u32) -> Duration {
        let mut delay = self.delay_for(attempt);
        if self.jitter && !self.base_delay.is_zero() {
            let extra = rand::thread_rng().gen_range(0..=self.base_delay.as_millis() as u64 / 2);
            delay += Duration::from_millis(extra);
        }
        delay
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

/// Builds the shared HTTP client used for all upstream requests
///
/// The upstream serves its full markup only to browser-looking agents,
/// so the configured desktop User-Agent and Accept-Language are set as
/// default headers. Redirects are followed (t.me redirects between
/// layout variants).
pub fn build_http_client(config: &UpstreamConfig) -> Result<Client, reqwest::Error> {
    let mut headers = header::HeaderMap::new();
    if let Ok(value) = header::HeaderValue::from_str(&config.accept_language) {
        headers.insert(header::ACCEPT_LANGUAGE, value);
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one upstream page as HTML text
///
/// Issues up to `policy.max_attempts` GETs with exponential backoff
/// between attempts. Only a 2xx body is returned; a 404 short-circuits
/// immediately and every other failure is treated as transient.
pub async fn fetch_page(
    client: &Client,
    policy: &RetryPolicy,
    url: &str,
) -> Result<String, FetchError> {
    let mut last_error = String::new();
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();

                if status == StatusCode::NOT_FOUND {
                    return Err(FetchError::NotFound {
                        url: url.to_string(),
                    });
                }

                if status.is_success() {
                    match response.text().await {
                        Ok(body) => return Ok(body),
                        Err(e) => last_error = format!("Body read failed: {}", e),
                    }
                } else {
                    last_error = format!("HTTP status {}", status.as_u16());
                }
            }
            Err(e) if e.is_timeout() => last_error = "Request timeout".to_string(),
            Err(e) if e.is_connect() => last_error = format!("Connection error: {}", e),
            Err(e) => last_error = e.to_string(),
        }

        if attempt < attempts {
            let delay = policy.sleep_duration(attempt);
            tracing::debug!(
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Transient fetch failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    Err(FetchError::Exhausted {
        url: url.to_string(),
        attempts,
        last_error,
    })
}
