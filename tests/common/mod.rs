//! Test helpers for E2E tests.
//!
//! Provides TestApp, which drives the command registry against an in-memory
//! database with captured output, and canned feed documents.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use gator::config::AggregatorConfig;
use gator::{
    build_registry, Command, Config, Database, FeedFetcher, OutputBuffer, Registry, Renderer,
    Session, State,
};

/// An RSS document with two items.
pub const TWO_ITEM_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Blog</title>
    <link>https://blog.example.com/</link>
    <description>Posts about things</description>
    <item>
      <title>Hello world</title>
      <link>https://blog.example.com/hello</link>
      <description>The first post</description>
      <pubDate>Mon, 21 Oct 2024 07:28:00 GMT</pubDate>
    </item>
    <item>
      <title>Second thoughts</title>
      <link>https://blog.example.com/second</link>
      <pubDate>Tue, 22 Oct 2024 09:15:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

/// Build an RSS document whose items link to `{base}/{n}` for each `n`.
pub fn feed_with_items(title: &str, base: &str, count: usize) -> String {
    let items: String = (1..=count)
        .map(|n| {
            format!(
                "<item><title>{title} #{n}</title><link>{base}/{n}</link>\
                 <pubDate>{n:02} Jan 2025 12:00:00 GMT</pubDate></item>"
            )
        })
        .collect();
    format!(
        "<rss version=\"2.0\"><channel><title>{title}</title><link>{base}</link>\
         <description></description>{items}</channel></rss>"
    )
}

/// Registry, state and captured output for one simulated process.
pub struct TestApp {
    pub registry: Registry,
    pub state: State,
    pub out: OutputBuffer,
}

impl TestApp {
    /// Create an app over a fresh in-memory database.
    pub async fn new() -> Self {
        Self::with_session(Session::in_memory(Config::default())).await
    }

    /// Create an app whose session persists to `path`.
    pub async fn with_config_file(path: &Path) -> Self {
        Self::with_session(Session::load(path).unwrap()).await
    }

    async fn with_session(session: Session) -> Self {
        let db = Database::open_in_memory().await.unwrap();
        let fetcher = FeedFetcher::new(&AggregatorConfig {
            request_timeout: Duration::from_secs(5),
            ..AggregatorConfig::default()
        })
        .unwrap();
        let (ui, out) = Renderer::buffered();

        Self {
            registry: build_registry(),
            state: State::new(db, session, fetcher, ui),
            out,
        }
    }

    /// Run a command line such as `["follow", "https://..."]`.
    pub async fn run(&mut self, words: &[&str]) -> gator::Result<()> {
        let cmd = Command::from_args(words.iter().copied()).expect("empty command line");
        self.registry.run(&mut self.state, cmd).await
    }

    /// Run a command that must succeed and return only its output.
    pub async fn output(&mut self, words: &[&str]) -> Vec<String> {
        self.out.clear();
        self.run(words)
            .await
            .unwrap_or_else(|e| panic!("{words:?} failed: {e}"));
        self.out.lines()
    }

    /// Count rows in `table`.
    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(self.state.db.pool())
            .await
            .unwrap()
    }
}
