//! The public scrape operation
//!
//! Validates inputs, drives the pagination controller, and assembles
//! the final [`ScrapeResult`]. Holds the only long-lived pieces of the
//! system: the shared HTTP client and the configuration.

use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::model::{ChannelMeta, ScrapeResult};
use crate::scrape::fetcher::{build_http_client, RetryPolicy};
use crate::scrape::paginator::{collect_pages, MAX_POSTS_CEILING};
use crate::scrape::stats::compute_stats;
use crate::{Result, ScrapeError};

/// Bounds on a channel identifier: ASCII alphanumeric, `_` and `.`,
/// 2 to 64 characters. The outer HTTP layer validates too; this is the
/// core's defense against identifiers that would template into
/// ill-formed upstream URLs.
const IDENTIFIER_MIN_LEN: usize = 2;
const IDENTIFIER_MAX_LEN: usize = 64;

/// Stateless-per-request scrape service
pub struct ScrapeService {
    config: Arc<Config>,
    client: Client,
    policy: RetryPolicy,
}

impl ScrapeService {
    /// Builds the service and its shared HTTP client
    pub fn new(config: Arc<Config>) -> std::result::Result<Self, reqwest::Error> {
        let client = build_http_client(&config.upstream)?;
        let policy = RetryPolicy::from(&config.retry);
        Ok(Self {
            config,
            client,
            policy,
        })
    }

    /// Scrapes up to `max_posts` recent posts plus channel metadata
    ///
    /// `max_posts` is clamped to `[1, 100]` and defaults to 100. Any
    /// page-level failure aborts the operation; there is no partial
    /// success for fetch-layer errors.
    pub async fn scrape(
        &self,
        identifier: &str,
        max_posts: Option<usize>,
    ) -> Result<ScrapeResult> {
        if !valid_identifier(identifier) {
            return Err(ScrapeError::InvalidIdentifier {
                identifier: identifier.to_string(),
            });
        }

        let max_posts = max_posts
            .unwrap_or(MAX_POSTS_CEILING)
            .clamp(1, MAX_POSTS_CEILING);

        tracing::info!(identifier, max_posts, "Scraping channel");

        let collected = collect_pages(
            &self.client,
            &self.policy,
            &self.config.upstream.base_url,
            identifier,
            max_posts,
        )
        .await?;

        tracing::info!(
            identifier,
            posts = collected.posts.len(),
            pages = collected.pages_fetched,
            "Scrape complete"
        );

        let stats = compute_stats(&collected.posts);
        let fragment = collected.channel;

        Ok(ScrapeResult {
            channel: ChannelMeta {
                identifier: identifier.to_string(),
                title: fragment.title,
                description: fragment.description,
                image: fragment.image,
                counters: fragment.counters,
            },
            stats,
            posts: collected.posts,
        })
    }
}

/// Checks the identifier pattern: `[A-Za-z0-9_.]{2,64}`
///
/// Dot-only identifiers are rejected even though they match the
/// character class: `..` is a dot segment under WHATWG URL path
/// normalization and would collapse out of the `/s/` path, retargeting
/// the fetch at the upstream root.
fn valid_identifier(identifier: &str) -> bool {
    let len = identifier.len();
    (IDENTIFIER_MIN_LEN..=IDENTIFIER_MAX_LEN).contains(&len)
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !identifier.chars().all(|c| c == '.')
}
