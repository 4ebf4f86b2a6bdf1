//! Feed, follow and post repositories for Gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{
    Feed, FeedFollowDetail, FeedFollowDetailRow, FeedFollow, FeedFollowRow, FeedRow,
    FeedWithOwner, FeedWithOwnerRow, NewFeed, NewPost, Post, PostRow, PostWithFeed,
    PostWithFeedRow,
};
use crate::datetime::{now_db, to_db};
use crate::db::DbPool;
use crate::{GatorError, Result};

const FEED_COLUMNS: &str =
    "f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at, f.last_fetched_at";

const FOLLOW_DETAIL_SELECT: &str = r#"
    SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at,
           u.name AS user_name, f.name AS feed_name, f.url AS feed_url
    FROM feed_follows ff
    JOIN users u ON u.id = ff.user_id
    JOIN feeds f ON f.id = ff.feed_id
"#;

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new feed.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let now = now_db();
        let row = sqlx::query_as::<_, FeedRow>(
            r#"
            INSERT INTO feeds (id, name, url, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, url, user_id, created_at, updated_at, last_fetched_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(&feed.user_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            GatorError::from_insert(e, || format!("feed {:?} already exists", feed.url))
        })?;

        Ok(Feed::from(row))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.id = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.url = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// List all feeds with their owner's name, in creation order.
    pub async fn list_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let query = format!(
            r#"
            SELECT {FEED_COLUMNS}, u.name AS user_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at ASC, f.id ASC
            "#
        );
        let rows = sqlx::query_as::<_, FeedWithOwnerRow>(&query)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(FeedWithOwner::from).collect())
    }

    /// Select the stalest feed across all owners.
    ///
    /// Feeds never fetched come first; ties fall back to creation order.
    pub async fn next_to_fetch(&self) -> Result<Option<Feed>> {
        let query = format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds f
            ORDER BY f.last_fetched_at ASC NULLS FIRST, f.created_at ASC, f.id ASC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Claim a feed by recording `at` as its last fetch time.
    ///
    /// The watermark never moves backwards: returns false if the feed is gone
    /// or already carries a later timestamp.
    pub async fn mark_fetched(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let at = to_db(&at);
        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = $1, updated_at = $1
            WHERE (last_fetched_at IS NULL OR last_fetched_at <= $1) AND id = $2
            "#,
        )
        .bind(&at)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for feed follow operations.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Make a user follow a feed.
    pub async fn create(&self, user_id: &str, feed_id: &str) -> Result<FeedFollowDetail> {
        let now = now_db();
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(feed_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| GatorError::from_insert(e, || "feed is already followed".to_string()))?;

        let query = format!("{FOLLOW_DETAIL_SELECT} WHERE ff.id = $1");
        let row = sqlx::query_as::<_, FeedFollowDetailRow>(&query)
            .bind(&id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".to_string()))?;

        Ok(FeedFollowDetail::from(row))
    }

    /// Get the follow between a user and a feed.
    pub async fn get(&self, user_id: &str, feed_id: &str) -> Result<Option<FeedFollow>> {
        let row = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT id, user_id, feed_id, created_at, updated_at
            FROM feed_follows
            WHERE user_id = $1 AND feed_id = $2
            "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(FeedFollow::from))
    }

    /// List every follow in the database.
    pub async fn list_all(&self) -> Result<Vec<FeedFollowDetail>> {
        let query = format!("{FOLLOW_DETAIL_SELECT} ORDER BY ff.created_at ASC, ff.id ASC");
        let rows = sqlx::query_as::<_, FeedFollowDetailRow>(&query)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(FeedFollowDetail::from).collect())
    }

    /// List the follows of one user.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<FeedFollowDetail>> {
        let query = format!(
            "{FOLLOW_DETAIL_SELECT} WHERE ff.user_id = $1 ORDER BY ff.created_at ASC, ff.id ASC"
        );
        let rows = sqlx::query_as::<_, FeedFollowDetailRow>(&query)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(FeedFollowDetail::from).collect())
    }

    /// Remove the follow between a user and a feed.
    pub async fn delete(&self, user_id: &str, feed_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id)
            .bind(feed_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a post unless its feed already has one with the same item key.
    ///
    /// Posts without a key are always stored. Returns true if a row was inserted.
    pub async fn create_or_ignore(&self, post: &NewPost) -> Result<bool> {
        let now = now_db();
        let result = sqlx::query(
            r#"
            INSERT INTO posts (id, title, url, item_key, description, published_at, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (feed_id, item_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.item_key)
        .bind(&post.description)
        .bind(to_db(&post.published_at))
        .bind(&post.feed_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List posts of one feed, newest first.
    pub async fn list_by_feed(&self, feed_id: &str) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, url, description, published_at, feed_id, created_at, updated_at
            FROM posts
            WHERE feed_id = $1
            ORDER BY published_at DESC, id ASC
            "#,
        )
        .bind(feed_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// List the newest posts across the feeds a user follows.
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<PostWithFeed>> {
        let rows = sqlx::query_as::<_, PostWithFeedRow>(
            r#"
            SELECT p.id, p.title, p.url, p.description, p.published_at, p.feed_id,
                   p.created_at, p.updated_at, f.name AS feed_name
            FROM posts p
            JOIN feeds f ON f.id = p.feed_id
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = $1
            ORDER BY p.published_at DESC, p.id ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(PostWithFeed::from).collect())
    }

    /// Count the posts of one feed.
    pub async fn count_by_feed(&self, feed_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db::{User, UserRepository};
    use crate::Database;
    use chrono::{Duration, TimeZone};

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn create_user(db: &Database, name: &str) -> User {
        UserRepository::new(db.pool()).create(name).await.unwrap()
    }

    async fn create_feed(db: &Database, user: &User, url: &str) -> Feed {
        FeedRepository::new(db.pool())
            .create(&NewFeed::new("Feed", url, &user.id))
            .await
            .unwrap()
    }

    fn new_post(feed: &Feed, url: &str, published_at: DateTime<Utc>) -> NewPost {
        NewPost {
            feed_id: feed.id.clone(),
            title: format!("Post {url}"),
            url: url.to_string(),
            item_key: Some(url.to_string()),
            description: None,
            published_at,
        }
    }

    #[tokio::test]
    async fn test_create_feed() {
        let db = setup_db().await;
        let user = create_user(&db, "alice").await;

        let feed = create_feed(&db, &user, "https://example.com/rss").await;
        assert_eq!(feed.url, "https://example.com/rss");
        assert_eq!(feed.user_id, user.id);
        assert!(feed.last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_create_feed_duplicate_url() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        create_feed(&db, &alice, "https://example.com/rss").await;
        let err = FeedRepository::new(db.pool())
            .create(&NewFeed::new("Other", "https://example.com/rss", &bob.id))
            .await
            .unwrap_err();
        assert!(matches!(err, GatorError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_get_feed_by_url_and_id() {
        let db = setup_db().await;
        let user = create_user(&db, "alice").await;
        let created = create_feed(&db, &user, "https://example.com/rss").await;
        let repo = FeedRepository::new(db.pool());

        assert_eq!(repo.get_by_url(&created.url).await.unwrap(), Some(created.clone()));
        assert_eq!(repo.get_by_id(&created.id).await.unwrap(), Some(created));
        assert!(repo.get_by_url("https://nope.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_with_owner() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        create_feed(&db, &alice, "https://a.example/rss").await;
        create_feed(&db, &bob, "https://b.example/rss").await;

        let feeds = FeedRepository::new(db.pool()).list_with_owner().await.unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].user_name, "alice");
        assert_eq!(feeds[1].user_name, "bob");
    }

    #[tokio::test]
    async fn test_next_to_fetch_prefers_never_fetched() {
        let db = setup_db().await;
        let user = create_user(&db, "alice").await;
        let repo = FeedRepository::new(db.pool());

        let old = create_feed(&db, &user, "https://old.example/rss").await;
        let recent = create_feed(&db, &user, "https://recent.example/rss").await;
        let never = create_feed(&db, &user, "https://never.example/rss").await;

        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(repo.mark_fetched(&old.id, base).await.unwrap());
        assert!(repo
            .mark_fetched(&recent.id, base + Duration::hours(1))
            .await
            .unwrap());

        let next = repo.next_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, never.id);

        repo.mark_fetched(&never.id, base + Duration::hours(2))
            .await
            .unwrap();
        let next = repo.next_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, old.id);
    }

    #[tokio::test]
    async fn test_next_to_fetch_empty() {
        let db = setup_db().await;
        assert!(FeedRepository::new(db.pool())
            .next_to_fetch()
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_mark_fetched_never_moves_backwards() {
        let db = setup_db().await;
        let user = create_user(&db, "alice").await;
        let feed = create_feed(&db, &user, "https://example.com/rss").await;
        let repo = FeedRepository::new(db.pool());

        let later = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let earlier = later - Duration::days(1);

        assert!(repo.mark_fetched(&feed.id, later).await.unwrap());
        assert!(!repo.mark_fetched(&feed.id, earlier).await.unwrap());

        let stored = repo.get_by_id(&feed.id).await.unwrap().unwrap();
        assert_eq!(stored.last_fetched_at, Some(later));
    }

    #[tokio::test]
    async fn test_follow_lifecycle() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let feed = create_feed(&db, &alice, "https://example.com/rss").await;
        let repo = FeedFollowRepository::new(db.pool());

        let detail = repo.create(&bob.id, &feed.id).await.unwrap();
        assert_eq!(detail.user_name, "bob");
        assert_eq!(detail.feed_url, "https://example.com/rss");

        assert!(repo.get(&bob.id, &feed.id).await.unwrap().is_some());
        assert_eq!(repo.list_for_user(&bob.id).await.unwrap().len(), 1);
        assert!(repo.list_for_user(&alice.id).await.unwrap().is_empty());
        assert_eq!(repo.list_all().await.unwrap().len(), 1);

        assert!(repo.delete(&bob.id, &feed.id).await.unwrap());
        assert!(!repo.delete(&bob.id, &feed.id).await.unwrap());
        assert!(repo.get(&bob.id, &feed.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_follow_twice_is_conflict() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let feed = create_feed(&db, &alice, "https://example.com/rss").await;
        let repo = FeedFollowRepository::new(db.pool());

        repo.create(&alice.id, &feed.id).await.unwrap();
        let err = repo.create(&alice.id, &feed.id).await.unwrap_err();
        match err {
            GatorError::Persistence(msg) => assert!(msg.contains("already followed")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_post_ignores_duplicate_link() {
        let db = setup_db().await;
        let user = create_user(&db, "alice").await;
        let feed = create_feed(&db, &user, "https://example.com/rss").await;
        let repo = PostRepository::new(db.pool());

        let post = new_post(&feed, "https://example.com/1", Utc::now());
        assert!(repo.create_or_ignore(&post).await.unwrap());
        assert!(!repo.create_or_ignore(&post).await.unwrap());
        assert_eq!(repo.count_by_feed(&feed.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_link_in_two_feeds() {
        let db = setup_db().await;
        let user = create_user(&db, "alice").await;
        let a = create_feed(&db, &user, "https://a.example/rss").await;
        let b = create_feed(&db, &user, "https://b.example/rss").await;
        let repo = PostRepository::new(db.pool());

        assert!(repo
            .create_or_ignore(&new_post(&a, "https://shared.example/x", Utc::now()))
            .await
            .unwrap());
        assert!(repo
            .create_or_ignore(&new_post(&b, "https://shared.example/x", Utc::now()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_posts_for_user() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let followed = create_feed(&db, &alice, "https://a.example/rss").await;
        let other = create_feed(&db, &bob, "https://b.example/rss").await;
        FeedFollowRepository::new(db.pool())
            .create(&alice.id, &followed.id)
            .await
            .unwrap();
        let repo = PostRepository::new(db.pool());

        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for i in 0..3 {
            repo.create_or_ignore(&new_post(
                &followed,
                &format!("https://a.example/{i}"),
                base + Duration::days(i),
            ))
            .await
            .unwrap();
        }
        repo.create_or_ignore(&new_post(&other, "https://b.example/0", base))
            .await
            .unwrap();

        let posts = repo.list_for_user(&alice.id, 2).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].post.url, "https://a.example/2");
        assert_eq!(posts[1].post.url, "https://a.example/1");
        assert_eq!(posts[0].feed_name, "Feed");
    }

    #[tokio::test]
    async fn test_delete_users_cascades() {
        let db = setup_db().await;
        let user = create_user(&db, "alice").await;
        let feed = create_feed(&db, &user, "https://example.com/rss").await;
        FeedFollowRepository::new(db.pool())
            .create(&user.id, &feed.id)
            .await
            .unwrap();
        PostRepository::new(db.pool())
            .create_or_ignore(&new_post(&feed, "https://example.com/1", Utc::now()))
            .await
            .unwrap();

        UserRepository::new(db.pool()).delete_all().await.unwrap();

        assert!(FeedRepository::new(db.pool())
            .get_by_id(&feed.id)
            .await
            .unwrap()
            .is_none());
        assert!(FeedFollowRepository::new(db.pool())
            .list_all()
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            PostRepository::new(db.pool())
                .count_by_feed(&feed.id)
                .await
                .unwrap(),
            0
        );
    }
}
