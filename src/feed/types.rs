//! Feed, follow and post types for Gator.

use chrono::{DateTime, Utc};

use crate::datetime::from_db;

/// A followed source of syndicated items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID.
    pub id: String,
    /// Display name given when the feed was added.
    pub name: String,
    /// Feed URL (globally unique).
    pub url: String,
    /// User who added the feed.
    pub user_id: String,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed row was last modified.
    pub updated_at: DateTime<Utc>,
    /// When the scheduler last claimed the feed. `None` until the first claim.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owning user ID.
    pub user_id: String,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id: user_id.into(),
        }
    }
}

/// A feed joined with its owner's name.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Name of the user who added it.
    pub user_name: String,
}

/// A user following a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: String,
    /// Following user.
    pub user_id: String,
    /// Followed feed.
    pub feed_id: String,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
    /// When the follow was last modified.
    pub updated_at: DateTime<Utc>,
}

/// A follow joined with the user and feed it connects.
#[derive(Debug, Clone)]
pub struct FeedFollowDetail {
    /// The follow.
    pub follow: FeedFollow,
    /// Name of the following user.
    pub user_name: String,
    /// Name of the followed feed.
    pub feed_name: String,
    /// URL of the followed feed.
    pub feed_url: String,
}

/// An item ingested from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID.
    pub id: String,
    /// Item title.
    pub title: String,
    /// Item link (unique within its feed).
    pub url: String,
    /// Item description.
    pub description: Option<String>,
    /// Publish date from the feed, or the ingestion time when unparseable.
    pub published_at: DateTime<Utc>,
    /// Feed the post came from.
    pub feed_id: String,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last modified.
    pub updated_at: DateTime<Utc>,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Feed ID.
    pub feed_id: String,
    /// Item title.
    pub title: String,
    /// Item link.
    pub url: String,
    /// Identity within the feed; `None` when the item has neither link nor guid.
    pub item_key: Option<String>,
    /// Item description.
    pub description: Option<String>,
    /// Publish date.
    pub published_at: DateTime<Utc>,
}

/// A post together with the name of its feed, as shown by `browse`.
#[derive(Debug, Clone)]
pub struct PostWithFeed {
    /// The post.
    pub post: Post,
    /// Name of the feed it came from.
    pub feed_name: String,
}

/// Row type for feeds from database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct FeedRow {
    pub id: String,
    pub name: String,
    pub url: String,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_fetched_at: Option<String>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            created_at: from_db(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: from_db(&row.updated_at).unwrap_or_else(Utc::now),
            last_fetched_at: row.last_fetched_at.and_then(|s| from_db(&s)),
        }
    }
}

/// Row type for feeds joined with their owner.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct FeedWithOwnerRow {
    #[sqlx(flatten)]
    pub feed: FeedRow,
    pub user_name: String,
}

impl From<FeedWithOwnerRow> for FeedWithOwner {
    fn from(row: FeedWithOwnerRow) -> Self {
        FeedWithOwner {
            feed: Feed::from(row.feed),
            user_name: row.user_name,
        }
    }
}

/// Row type for feed follows from database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct FeedFollowRow {
    pub id: String,
    pub user_id: String,
    pub feed_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FeedFollowRow> for FeedFollow {
    fn from(row: FeedFollowRow) -> Self {
        FeedFollow {
            id: row.id,
            user_id: row.user_id,
            feed_id: row.feed_id,
            created_at: from_db(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: from_db(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for follows joined with user and feed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct FeedFollowDetailRow {
    #[sqlx(flatten)]
    pub follow: FeedFollowRow,
    pub user_name: String,
    pub feed_name: String,
    pub feed_url: String,
}

impl From<FeedFollowDetailRow> for FeedFollowDetail {
    fn from(row: FeedFollowDetailRow) -> Self {
        FeedFollowDetail {
            follow: FeedFollow::from(row.follow),
            user_name: row.user_name,
            feed_name: row.feed_name,
            feed_url: row.feed_url,
        }
    }
}

/// Row type for posts from database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: String,
    pub feed_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: from_db(&row.published_at).unwrap_or_else(Utc::now),
            feed_id: row.feed_id,
            created_at: from_db(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: from_db(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for posts joined with their feed name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PostWithFeedRow {
    #[sqlx(flatten)]
    pub post: PostRow,
    pub feed_name: String,
}

impl From<PostWithFeedRow> for PostWithFeed {
    fn from(row: PostWithFeedRow) -> Self {
        PostWithFeed {
            post: Post::from(row.post),
            feed_name: row.feed_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_from_row_without_fetch() {
        let row = FeedRow {
            id: "f1".to_string(),
            name: "Blog".to_string(),
            url: "https://example.com/rss".to_string(),
            user_id: "u1".to_string(),
            created_at: "2024-01-15T10:30:00.000000Z".to_string(),
            updated_at: "2024-01-15T10:30:00.000000Z".to_string(),
            last_fetched_at: None,
        };

        let feed = Feed::from(row);
        assert_eq!(feed.name, "Blog");
        assert!(feed.last_fetched_at.is_none());
    }

    #[test]
    fn test_post_from_row() {
        let row = PostRow {
            id: "p1".to_string(),
            title: "Hello".to_string(),
            url: "https://example.com/1".to_string(),
            description: None,
            published_at: "2024-10-21T07:28:00.000000Z".to_string(),
            feed_id: "f1".to_string(),
            created_at: "2024-10-21T08:00:00.000000Z".to_string(),
            updated_at: "2024-10-21T08:00:00.000000Z".to_string(),
        };

        let post = Post::from(row);
        assert_eq!(post.title, "Hello");
        assert!(post.published_at < post.created_at);
    }
}
