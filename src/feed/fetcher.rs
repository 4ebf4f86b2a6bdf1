//! RSS feed fetcher.
//!
//! One HTTP GET per call, no retries. The body is decoded as an RSS channel
//! document and handed back with the raw item dates left untouched; date
//! interpretation belongs to the ingestor.

use reqwest::Client;
use tracing::debug;

use crate::config::AggregatorConfig;
use crate::{GatorError, Result};

/// A decoded feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    /// Channel title.
    pub title: String,
    /// Channel link.
    pub link: String,
    /// Channel description.
    pub description: String,
    /// Items in document order.
    pub items: Vec<ParsedItem>,
}

/// A decoded feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    /// Item title (empty when absent).
    pub title: String,
    /// Item link (empty when absent).
    pub link: String,
    /// Item guid.
    pub guid: Option<String>,
    /// Item description.
    pub description: Option<String>,
    /// Publish date exactly as it appears in the document.
    pub pub_date: Option<String>,
}

/// RSS feed fetcher sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    /// Create a fetcher from the aggregator settings.
    pub fn new(config: &AggregatorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatorError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch and parse the feed at `url`.
    pub async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        validate_url(url)?;
        debug!(url, "Fetching feed");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::Network(format!("failed to fetch {url}: {e}")))?;

        // Check response status
        if !response.status().is_success() {
            return Err(GatorError::Http(format!(
                "{url} responded with {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatorError::Http(format!("failed to read response from {url}: {e}")))?;

        parse_feed(&bytes)
    }
}

/// Check that `url` is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| GatorError::Validation(format!("invalid URL {url:?}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(GatorError::Validation(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(GatorError::Validation(format!("URL has no host: {url}")));
    }

    Ok(())
}

/// Parse feed bytes into a ParsedFeed.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let channel = rss::Channel::read_from(bytes)
        .map_err(|e| GatorError::Parse(format!("failed to parse feed: {e}")))?;

    let items = channel
        .items()
        .iter()
        .map(|item| ParsedItem {
            title: item.title().unwrap_or_default().to_string(),
            link: item.link().unwrap_or_default().to_string(),
            guid: item.guid().map(|guid| guid.value().to_string()),
            description: item.description().map(str::to_string),
            pub_date: item.pub_date().map(str::to_string),
        })
        .collect();

    Ok(ParsedFeed {
        title: channel.title().to_string(),
        link: channel.link().to_string(),
        description: channel.description().to_string(),
        items,
    })
}
