//! Aggregate statistics over a collected post list
//!
//! Averages are rounded to the nearest integer and absent (`None`) when
//! the underlying data is absent, never defaulted to zero.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::{ChannelStats, Post};

/// Computes all channel aggregates in one pass over the posts
pub fn compute_stats(posts: &[Post]) -> ChannelStats {
    ChannelStats {
        avg_posts_per_day: avg_posts_per_day(posts),
        avg_views_per_post: avg_views_per_post(posts),
        avg_comments_per_post: avg_comments_per_post(posts),
        avg_reactions_per_post: avg_reactions_per_post(posts),
    }
}

/// Average posts per distinct calendar day (of the post's own offset)
fn avg_posts_per_day(posts: &[Post]) -> Option<u64> {
    let mut day_counts: HashMap<NaiveDate, u64> = HashMap::new();
    for post in posts {
        *day_counts.entry(post.timestamp.date_naive()).or_insert(0) += 1;
    }
    if day_counts.is_empty() {
        return None;
    }
    let total: u64 = day_counts.values().sum();
    Some(rounded_div(total, day_counts.len() as u64))
}

fn avg_views_per_post(posts: &[Post]) -> Option<u64> {
    if posts.is_empty() {
        return None;
    }
    // Posts without a rendered view count contribute zero but still
    // count toward the denominator.
    let total: u64 = posts.iter().map(|p| p.views.unwrap_or(0)).sum();
    Some(rounded_div(total, posts.len() as u64))
}

/// Average over only the posts that carry a comment counter
fn avg_comments_per_post(posts: &[Post]) -> Option<u64> {
    let with_comments: Vec<u64> = posts.iter().filter_map(|p| p.comments).collect();
    if with_comments.is_empty() {
        return None;
    }
    let total: u64 = with_comments.iter().sum();
    Some(rounded_div(total, with_comments.len() as u64))
}

fn avg_reactions_per_post(posts: &[Post]) -> Option<u64> {
    if posts.is_empty() {
        return None;
    }
    let total: u64 = posts.iter().map(|p| p.reactions).sum();
    Some(rounded_div(total, posts.len() as u64))
}

fn rounded_div(total: u64, n: u64) -> u64 {
    (total + n / 2) / n
}
