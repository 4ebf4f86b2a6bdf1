//! Gator - a command-line RSS aggregator
//!
//! Users register, follow feeds, and a background scheduler keeps fetching
//! the stalest feed and storing its items as posts.

pub mod command;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod session;
pub mod ui;

pub use command::{build_registry, Command, CommandHandler, LoggedIn, Registry, State};
pub use config::Config;
pub use db::{Database, User, UserRepository};
pub use error::{GatorError, Result};
pub use feed::{
    CycleOutcome, Feed, FeedFetcher, FeedFollowRepository, FeedRepository, FetchScheduler,
    IngestReport, Post, PostRepository,
};
pub use session::Session;
pub use ui::{OutputBuffer, Renderer};
