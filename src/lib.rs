//! Telechan: a Telegram public-channel scraping service
//!
//! This crate turns the server-rendered web view of a public Telegram
//! channel (`https://t.me/s/<username>`) into structured data: channel
//! metadata plus a bounded, de-duplicated list of recent posts, exposed
//! over a small JSON HTTP API.

pub mod config;
pub mod count;
pub mod model;
pub mod scrape;
pub mod server;

use thiserror::Error;

/// Main error type for scrape operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid channel identifier: {identifier:?}")]
    InvalidIdentifier { identifier: String },

    #[error("Channel not found: {identifier}")]
    ChannelNotFound { identifier: String },

    #[error("Fetch failed for {url} after {attempts} attempt(s): {last_error}")]
    FetchFailed {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Upstream URL error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for scrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use count::parse_compact;
pub use model::{ChannelMeta, ChannelStats, CounterKind, MediaFlags, Post, ScrapeResult};
pub use scrape::ScrapeService;
