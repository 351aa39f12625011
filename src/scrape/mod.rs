//! Scraping pipeline: fetch, extract, paginate, assemble
//!
//! Data flows strictly downward:
//! service → paginator → {fetcher, extractor} → count parser.
//! No component keeps state across invocations.

mod extractor;
mod fetcher;
mod paginator;
mod service;
mod stats;

pub use extractor::{extract_page, ChannelFragment, ExtractError, ExtractedPage};
pub use fetcher::{build_http_client, fetch_page, FetchError, RetryPolicy};
pub use paginator::{collect_pages, CollectedPages, MAX_POSTS_CEILING, PAGE_CAP};
pub use service::ScrapeService;
pub use stats::compute_stats;
