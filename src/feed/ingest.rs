//! Post ingestion.
//!
//! Turns parsed feed items into stored posts. A bad date never drops an item;
//! a storage failure stops the rest of the batch.

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::fetcher::ParsedItem;
use super::repository::PostRepository;
use super::types::{Feed, NewPost};
use crate::datetime::parse_pub_date;
use crate::db::DbPool;
use crate::Result;

/// Result of ingesting one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Posts stored.
    pub inserted: usize,
    /// Items whose link or guid the feed already had.
    pub skipped: usize,
}

/// Resolve an item's publish date, falling back to `now`.
pub fn resolve_published_at(pub_date: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    pub_date.and_then(parse_pub_date).unwrap_or(now)
}

/// Identity of an item within its feed: the link, else the guid.
///
/// Items with neither have no identity and are stored on every fetch.
pub fn item_key(item: &ParsedItem) -> Option<String> {
    if !item.link.trim().is_empty() {
        return Some(item.link.clone());
    }
    item.guid
        .as_deref()
        .filter(|guid| !guid.trim().is_empty())
        .map(|guid| format!("guid:{guid}"))
}

/// Build the post to store for one item.
pub fn new_post(feed: &Feed, item: &ParsedItem, now: DateTime<Utc>) -> NewPost {
    NewPost {
        feed_id: feed.id.clone(),
        title: item.title.clone(),
        url: item.link.clone(),
        item_key: item_key(item),
        description: item.description.clone().filter(|d| !d.is_empty()),
        published_at: resolve_published_at(item.pub_date.as_deref(), now),
    }
}

/// Store every item of `items` as a post of `feed`.
///
/// Items are written in order. The first storage error is returned and the
/// remaining items are not attempted; posts already written stay.
pub async fn ingest_items(pool: &DbPool, feed: &Feed, items: &[ParsedItem]) -> Result<IngestReport> {
    let repo = PostRepository::new(pool);
    let mut report = IngestReport::default();

    for item in items {
        let post = new_post(feed, item, Utc::now());
        match repo.create_or_ignore(&post).await {
            Ok(true) => {
                report.inserted += 1;
                debug!(feed_id = %feed.id, title = %post.title, "Stored post");
            }
            Ok(false) => report.skipped += 1,
            Err(e) => {
                error!(feed_id = %feed.id, link = %post.url, "Failed to store post: {}", e);
                return Err(e);
            }
        }
    }

    Ok(report)
}
