//! HTML extraction for one upstream channel page
//!
//! The upstream has no JSON API; everything here is structural matching
//! against the server-rendered `t.me/s/<username>` markup. The
//! selectors are deliberately isolated in this module so the fragile
//! markup coupling can be tested against fixtures and swapped without
//! touching retry or pagination logic.
//!
//! Per-field failures degrade to "field absent"; a malformed message
//! block is skipped; only a page that cannot be processed at all is an
//! error.

use std::collections::BTreeMap;

use chrono::DateTime;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::count::parse_compact;
use crate::model::{CounterKind, MediaFlags, Post};

/// Page-level extraction failure
///
/// Aborts the whole pagination loop; individual malformed blocks never
/// raise this.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExtractError {
    pub message: String,
}

/// Channel header fields extracted from a page
///
/// Same shape as [`crate::model::ChannelMeta`] minus the identifier,
/// which only the caller knows.
#[derive(Debug, Clone, Default)]
pub struct ChannelFragment {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub counters: BTreeMap<CounterKind, u64>,
}

/// Everything extracted from one page
#[derive(Debug)]
pub struct ExtractedPage {
    pub channel: ChannelFragment,
    /// Posts in page render order (oldest to newest)
    pub posts: Vec<Post>,
    /// Minimum post id on the page, used as the `before=` cursor for
    /// the next (older) page; `None` when the page had no usable posts
    pub oldest_id: Option<u64>,
}

/// Pre-parsed selectors for one extraction pass
struct Selectors {
    header_title: Selector,
    description: Selector,
    counter: Selector,
    counter_value: Selector,
    counter_type: Selector,
    og_image: Selector,
    link_image: Selector,
    header_photo: Selector,
    message: Selector,
    bubble: Selector,
    text: Selector,
    date: Selector,
    views: Selector,
    reaction_old: Selector,
    reaction_new: Selector,
    reaction_count: Selector,
    comments: Selector,
    inline_buttons: Selector,
    photo: Selector,
    video: Selector,
    document: Selector,
}

impl Selectors {
    fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            header_title: sel(".tgme_channel_info_header_title")?,
            description: sel(".tgme_channel_info_description")?,
            counter: sel(".tgme_channel_info_counter")?,
            counter_value: sel(".counter_value")?,
            counter_type: sel(".counter_type")?,
            og_image: sel(r#"meta[property="og:image"]"#)?,
            link_image: sel(r#"link[rel="image_src"]"#)?,
            header_photo: sel(
                ".tgme_channel_info_header_photo img, img.tgme_page_photo_image, \
                 .tgme_page .tgme_page_photo img",
            )?,
            message: sel(".tgme_widget_message")?,
            bubble: sel(".tgme_widget_message_bubble")?,
            text: sel(".tgme_widget_message_text")?,
            date: sel(".tgme_widget_message_date time, .tgme_widget_message_meta time")?,
            views: sel(".tgme_widget_message_views")?,
            reaction_old: sel(".tgme_widget_message_reactions span.tgme_reaction")?,
            reaction_new: sel(".tgme_widget_message_inline_buttons a.tgme_widget_message_reaction")?,
            reaction_count: sel(".tgme_widget_message_reaction_count")?,
            comments: sel("a.tgme_widget_message_comments")?,
            inline_buttons: sel(".tgme_widget_message_inline_buttons a")?,
            photo: sel(".tgme_widget_message_photo_wrap")?,
            video: sel(
                ".tgme_widget_message_video_player, .tgme_widget_message_video_wrap, \
                 .tgme_widget_message_roundvideo_player",
            )?,
            document: sel(".tgme_widget_message_document")?,
        })
    }
}

fn sel(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError {
        message: format!("Invalid selector {:?}: {}", css, e),
    })
}

/// Extracts channel metadata, posts, and the pagination cursor from one
/// page of upstream HTML
///
/// `base_url` is used to absolutize relative image URLs.
pub fn extract_page(html: &str, base_url: &str) -> Result<ExtractedPage, ExtractError> {
    let selectors = Selectors::new()?;
    let document = Html::parse_document(html);

    let channel = extract_channel(&document, &selectors, base_url);

    let mut posts = Vec::new();
    for block in document.select(&selectors.message) {
        // Service messages (joins, pins) have no bubble and no content
        // worth yielding.
        if block.select(&selectors.bubble).next().is_none() {
            continue;
        }

        match extract_post(block, &selectors) {
            Some(post) => posts.push(post),
            None => {
                tracing::debug!("Skipping message block without usable id/timestamp");
            }
        }
    }

    let oldest_id = posts.iter().map(|p| p.id).min();

    Ok(ExtractedPage {
        channel,
        posts,
        oldest_id,
    })
}

fn extract_channel(document: &Html, selectors: &Selectors, base_url: &str) -> ChannelFragment {
    let title = document
        .select(&selectors.header_title)
        .next()
        .map(|el| collect_text(el))
        .filter(|s| !s.is_empty());

    let description = document
        .select(&selectors.description)
        .next()
        .map(|el| collect_text(el))
        .filter(|s| !s.is_empty());

    let image = extract_channel_image(document, selectors, base_url);

    let mut counters = BTreeMap::new();
    for counter in document.select(&selectors.counter) {
        let Some(kind) = counter
            .select(&selectors.counter_type)
            .next()
            .and_then(|el| CounterKind::from_label(&collect_text(el)))
        else {
            continue;
        };
        let Some(value) = counter
            .select(&selectors.counter_value)
            .next()
            .and_then(|el| parse_compact(&collect_text(el)).ok())
        else {
            // Unparsable counter text: omit the counter, never fail the
            // page and never default to 0.
            continue;
        };
        counters.insert(kind, value);
    }

    ChannelFragment {
        title,
        description,
        image,
        counters,
    }
}

/// Channel image priority: og:image meta, then the legacy
/// link[rel=image_src] hint, then header photo elements.
fn extract_channel_image(
    document: &Html,
    selectors: &Selectors,
    base_url: &str,
) -> Option<String> {
    if let Some(content) = document
        .select(&selectors.og_image)
        .next()
        .and_then(|el| el.value().attr("content"))
    {
        return absolutize(base_url, content);
    }

    if let Some(href) = document
        .select(&selectors.link_image)
        .next()
        .and_then(|el| el.value().attr("href"))
    {
        return absolutize(base_url, href);
    }

    document
        .select(&selectors.header_photo)
        .next()
        .and_then(|el| el.value().attr("src"))
        .and_then(|src| absolutize(base_url, src))
}

/// Returns `None` when the block lacks a parseable id or timestamp; such
/// blocks cannot satisfy the identity and dedup contracts.
fn extract_post(block: ElementRef, selectors: &Selectors) -> Option<Post> {
    let id = block
        .value()
        .attr("data-post")
        .and_then(parse_data_post)?;

    let timestamp = block
        .select(&selectors.date)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .and_then(|dt| DateTime::parse_from_rfc3339(dt).ok())?;

    let text = block
        .select(&selectors.text)
        .next()
        .map(|el| collect_text(el))
        .unwrap_or_default();

    let views = block
        .select(&selectors.views)
        .next()
        .and_then(|el| parse_compact(&collect_text(el)).ok());

    let reactions = extract_reactions(block, selectors);
    let comments = extract_comments(block, selectors);

    let media = MediaFlags {
        photo: block.select(&selectors.photo).next().is_some(),
        video: block.select(&selectors.video).next().is_some(),
        document: block.select(&selectors.document).next().is_some(),
    };

    Some(Post {
        id,
        timestamp,
        text,
        views,
        reactions,
        comments,
        media,
    })
}

/// `data-post` carries `"<channel>/<id>"`; only the numeric tail is
/// channel-local identity.
fn parse_data_post(value: &str) -> Option<u64> {
    let (_, id) = value.split_once('/')?;
    id.parse().ok()
}

/// Sums reaction counts across both upstream layouts: the old
/// `span.tgme_reaction` footer and the newer inline-button anchors.
fn extract_reactions(block: ElementRef, selectors: &Selectors) -> u64 {
    let mut total = 0u64;

    for span in block.select(&selectors.reaction_old) {
        // Hidden spacer spans pad the row in the old layout.
        let style = span.value().attr("style").unwrap_or("");
        if style.replace(' ', "").contains("visibility:hidden") {
            continue;
        }
        if let Some(count) = embedded_count(&collect_text(span)) {
            total += count;
        }
    }

    for anchor in block.select(&selectors.reaction_new) {
        let count = anchor
            .select(&selectors.reaction_count)
            .next()
            .and_then(|el| parse_compact(&collect_text(el)).ok())
            .or_else(|| embedded_count(&collect_text(anchor)));
        if let Some(count) = count {
            total += count;
        }
    }

    total
}

/// Comment counter from the classic comments anchor, falling back to an
/// inline button whose href points at the comments view.
fn extract_comments(block: ElementRef, selectors: &Selectors) -> Option<u64> {
    if let Some(anchor) = block.select(&selectors.comments).next() {
        return embedded_count(&collect_text(anchor));
    }

    for anchor in block.select(&selectors.inline_buttons) {
        let href = anchor.value().attr("href").unwrap_or("");
        if href.contains("comment") {
            return embedded_count(&collect_text(anchor));
        }
    }

    None
}

/// Collects visible text under an element, rendering `<br>` as a
/// newline the way the upstream's own text layout reads.
fn collect_text(el: ElementRef) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        if let Some(text) = node.value().as_text() {
            out.push_str(text);
        } else if let Some(elem) = node.value().as_element() {
            if elem.name() == "br" {
                out.push('\n');
            }
        }
    }
    out.trim().to_string()
}

/// Pulls the first compact-count token out of mixed text like
/// "👍 1.2K" or "5 comments".
fn embedded_count(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];

    let mut end = 0;
    for (i, c) in rest.char_indices() {
        if c.is_ascii_digit() || c == ',' || c == '.' || c.is_whitespace() {
            end = i + c.len_utf8();
        } else {
            if matches!(c, 'k' | 'K' | 'm' | 'M') {
                end = i + c.len_utf8();
            }
            break;
        }
    }

    parse_compact(rest[..end].trim()).ok()
}

/// Absolutizes upstream-relative URLs; protocol-relative and rooted
/// paths are the forms t.me actually emits.
fn absolutize(base_url: &str, u: &str) -> Option<String> {
    let u = u.trim();
    if u.is_empty() {
        return None;
    }
    if u.starts_with("http://") || u.starts_with("https://") {
        return Some(u.to_string());
    }
    if let Some(rest) = u.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    if u.starts_with('/') {
        return Some(format!("{}{}", base_url.trim_end_matches('/'), u));
    }
    Some(u.to_string())
}
