//! Feed module for Gator.
//!
//! This module provides feed subscriptions, fetching, post ingestion and the
//! background fetch scheduler.

pub mod fetcher;
pub mod ingest;
pub mod repository;
pub mod scheduler;
pub mod types;

pub use fetcher::{parse_feed, validate_url, FeedFetcher, ParsedFeed, ParsedItem};
pub use ingest::{ingest_items, IngestReport};
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::{CycleOutcome, FetchScheduler};
pub use types::{
    Feed, FeedFollow, FeedFollowDetail, FeedWithOwner, NewFeed, NewPost, Post, PostWithFeed,
};
