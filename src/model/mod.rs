//! Response data model
//!
//! All entities here are built fresh for one scrape invocation and
//! serialized straight into the JSON response; nothing is persisted.
//! Optional fields are skipped when absent so that "not rendered by the
//! upstream" can never be mistaken for a real zero.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Canonical channel-counter kinds rendered in the t.me header
///
/// Unknown counter labels are ignored during extraction rather than
/// mapped to a catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    Subscribers,
    Photos,
    Videos,
    Files,
    Links,
}

impl CounterKind {
    /// Maps a `.counter_type` label to its canonical kind
    ///
    /// The upstream renders both singular and plural labels ("1 subscriber"
    /// vs "2 subscribers").
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "subscriber" | "subscribers" | "member" | "members" => Some(Self::Subscribers),
            "photo" | "photos" => Some(Self::Photos),
            "video" | "videos" => Some(Self::Videos),
            "file" | "files" => Some(Self::Files),
            "link" | "links" => Some(Self::Links),
            _ => None,
        }
    }
}

/// Channel identity and header metadata
#[derive(Debug, Clone, Serialize)]
pub struct ChannelMeta {
    /// The requested handle, echoed back
    pub identifier: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Absolute URL of the channel photo, when rendered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Header counters; a key is present only if the upstream rendered
    /// that counter and its value parsed
    pub counters: BTreeMap<CounterKind, u64>,
}

/// Presence of media containers within a message block
///
/// Flags only; media is never downloaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MediaFlags {
    pub photo: bool,
    pub video: bool,
    pub document: bool,
}

/// One channel message
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Channel-local message id; public identity and pagination cursor
    pub id: u64,

    /// Publication time from the machine-readable `datetime` attribute
    pub timestamp: DateTime<FixedOffset>,

    /// Visible message text; empty for media-only posts
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,

    /// Sum of all reaction counts; 0 when the post has none
    pub reactions: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,

    pub media: MediaFlags,
}

impl Post {
    /// Dedup key used to suppress repeated renderings of the same post
    /// across overlapping pages: `(timestamp, first 50 chars of text)`.
    ///
    /// This is intentionally coarser than `id`; see the pagination loop
    /// for how the two interact.
    pub fn dedup_key(&self) -> (i64, String) {
        (
            self.timestamp.timestamp(),
            self.text.chars().take(50).collect(),
        )
    }
}

/// Aggregates computed over the collected posts
///
/// Each average is absent when it cannot be computed (no posts, or no
/// posts carrying the underlying field).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_posts_per_day: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_views_per_post: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_comments_per_post: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_reactions_per_post: Option<u64>,
}

/// The scrape operation's output
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResult {
    pub channel: ChannelMeta,
    pub stats: ChannelStats,
    /// Posts newest first, truncated to the effective `max_posts`
    pub posts: Vec<Post>,
}
