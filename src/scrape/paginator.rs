//! Cursor-based pagination over the upstream web view
//!
//! The only paging primitive the upstream exposes is
//! `?before=<post id>`: "give me posts older than X". Adjacent pages
//! overlap, so the loop de-duplicates as it goes, and two hard caps
//! bound the damage if the cursor ever stops converging.

use std::collections::HashSet;

use reqwest::Client;
use url::Url;

use crate::scrape::extractor::{extract_page, ChannelFragment};
use crate::scrape::fetcher::{fetch_page, FetchError, RetryPolicy};
use crate::model::Post;
use crate::{Result, ScrapeError};

/// Hard ceiling on posts returned per operation, regardless of the
/// caller-requested limit
pub const MAX_POSTS_CEILING: usize = 100;

/// Hard ceiling on pages fetched per operation; safety valve against
/// unbounded pagination or a non-converging cursor
pub const PAGE_CAP: usize = 20;

/// Result of a full pagination run
#[derive(Debug)]
pub struct CollectedPages {
    /// Channel header fragment captured from the first page
    pub channel: ChannelFragment,
    /// De-duplicated posts, newest first, truncated to `max_posts`
    pub posts: Vec<Post>,
    /// Pages actually fetched
    pub pages_fetched: usize,
}

/// Drives repeated fetch+extract cycles until `max_posts` posts are
/// collected or the upstream is exhausted
///
/// Pages are fetched strictly one at a time: each page's cursor depends
/// on the previous page's oldest post id. Any fetch or extraction
/// failure aborts the whole run; posts collected so far are discarded.
pub async fn collect_pages(
    client: &Client,
    policy: &RetryPolicy,
    base_url: &str,
    identifier: &str,
    max_posts: usize,
) -> Result<CollectedPages> {
    let mut cursor: Option<u64> = None;
    let mut seen_keys: HashSet<(i64, String)> = HashSet::new();
    let mut seen_ids: HashSet<u64> = HashSet::new();
    let mut collected: Vec<Post> = Vec::new();
    let mut pages_fetched = 0usize;
    let mut channel: Option<ChannelFragment> = None;

    loop {
        let url = page_url(base_url, identifier, cursor)?;
        let html = fetch_page(client, policy, url.as_str())
            .await
            .map_err(|e| map_fetch_error(e, identifier))?;

        let page = extract_page(&html, base_url).map_err(|e| ScrapeError::Extraction {
            url: url.to_string(),
            message: e.message,
        })?;
        pages_fetched += 1;

        // The header only needs to be read once; later pages repeat it.
        if channel.is_none() {
            channel = Some(page.channel);
        }

        let mut new_posts = 0usize;
        for post in page.posts {
            let key = post.dedup_key();
            if seen_keys.contains(&key) || seen_ids.contains(&post.id) {
                // Overlap with the previous page.
                continue;
            }
            seen_keys.insert(key);
            seen_ids.insert(post.id);
            collected.push(post);
            new_posts += 1;
        }

        tracing::debug!(
            identifier,
            page = pages_fetched,
            new_posts,
            total = collected.len(),
            cursor = ?page.oldest_id,
            "Processed upstream page"
        );

        if collected.len() >= max_posts {
            break;
        }
        if new_posts == 0 {
            // No forward progress; the upstream is exhausted or the
            // cursor stopped moving.
            break;
        }
        let Some(oldest_id) = page.oldest_id else {
            break;
        };
        if pages_fetched >= PAGE_CAP {
            tracing::warn!(identifier, pages_fetched, "Page cap reached, stopping pagination");
            break;
        }
        cursor = Some(oldest_id);
    }

    // Each page renders oldest-first and successive pages go further
    // back in time; one id-descending sort yields newest-first output.
    collected.sort_by(|a, b| b.id.cmp(&a.id));
    collected.truncate(max_posts);

    Ok(CollectedPages {
        channel: channel.unwrap_or_default(),
        posts: collected,
        pages_fetched,
    })
}

/// Templates the page URL: `<base>/s/<identifier>`, with `before=` only
/// once a cursor exists
fn page_url(base_url: &str, identifier: &str, cursor: Option<u64>) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    url.set_path(&format!("s/{}", identifier));
    if let Some(before) = cursor {
        url.query_pairs_mut()
            .append_pair("before", &before.to_string());
    }
    Ok(url)
}

fn map_fetch_error(error: FetchError, identifier: &str) -> ScrapeError {
    match error {
        FetchError::NotFound { .. } => ScrapeError::ChannelNotFound {
            identifier: identifier.to_string(),
        },
        FetchError::Exhausted {
            url,
            attempts,
            last_error,
        } => ScrapeError::FetchFailed {
            url,
            attempts,
            last_error,
        },
    }
}
