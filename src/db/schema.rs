//! Database schema and migrations for Gator.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded. The SQL sticks to what SQLite and PostgreSQL both accept: text
//! UUID keys and RFC 3339 text timestamps.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users
    r#"
CREATE TABLE users (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
"#,
    // v2: Feeds, owned by the user who added them
    r#"
CREATE TABLE feeds (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    url              TEXT NOT NULL UNIQUE,
    user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    last_fetched_at  TEXT
);

CREATE INDEX idx_feeds_user_id ON feeds(user_id);
CREATE INDEX idx_feeds_last_fetched_at ON feeds(last_fetched_at);
"#,
    // v3: Feed follows (user <-> feed)
    r#"
CREATE TABLE feed_follows (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    feed_id     TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE(user_id, feed_id)
);

CREATE INDEX idx_feed_follows_feed_id ON feed_follows(feed_id);
"#,
    // v4: Posts ingested from feeds. item_key (link, else guid) is unique
    // within a feed; items with neither have a NULL key and never conflict.
    r#"
CREATE TABLE posts (
    id            TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    url           TEXT NOT NULL,
    item_key      TEXT,
    description   TEXT,
    published_at  TEXT NOT NULL,
    feed_id       TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE(feed_id, item_key)
);

CREATE INDEX idx_posts_published_at ON posts(published_at);
"#,
];
