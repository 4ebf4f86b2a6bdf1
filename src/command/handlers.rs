//! Built-in Gator commands.

use std::time::Duration;

use futures::FutureExt;
use tracing::{info, warn};

use super::{Command, CommandHandler, HandlerFuture, LoggedIn, Registry, State};
use crate::datetime::format_utc_datetime;
use crate::db::{User, UserRepository};
use crate::feed::{
    validate_url, FeedFollowRepository, FeedRepository, FetchScheduler, NewFeed, PostRepository,
};
use crate::{GatorError, Result};

/// Command names with their usage line and a short description, in help order.
const COMMANDS: &[(&str, &str, &str)] = &[
    ("register", "register <name>", "create a user and log in as it"),
    ("login", "login <name>", "switch the current user"),
    ("reset", "reset", "delete every user with their feeds and posts"),
    ("users", "users", "list users"),
    ("feeds", "feeds", "list feeds with their owners"),
    ("listfollows", "listfollows", "list every follow"),
    ("addfeed", "addfeed <name> <url>", "add a feed and follow it"),
    ("follow", "follow <url>", "follow an existing feed"),
    ("unfollow", "unfollow <url>", "stop following a feed"),
    ("following", "following", "list the feeds you follow"),
    ("browse", "browse [limit]", "show the newest posts from followed feeds"),
    ("agg", "agg <duration>", "fetch feeds every <duration> until interrupted"),
    ("help", "help", "show this help"),
];

fn usage(name: &str) -> &'static str {
    COMMANDS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, usage, _)| *usage)
        .unwrap_or("")
}

/// Build the registry with every built-in command.
pub fn build_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register("register", register);
    registry.register("login", login);
    registry.register("reset", reset);
    registry.register("users", users);
    registry.register("feeds", feeds);
    registry.register("listfollows", list_follows);
    registry.register("addfeed", LoggedIn(add_feed));
    registry.register("follow", LoggedIn(follow));
    registry.register("unfollow", LoggedIn(unfollow));
    registry.register("following", LoggedIn(following));
    registry.register("browse", LoggedIn(browse));
    registry.register("agg", agg);

    let mut names = registry.names().to_vec();
    names.push("help".to_string());
    registry.register("help", HelpCommand::new(names));
    registry
}

/// Parse an aggregation interval such as `30s`, `1m` or `1h30m`.
///
/// The interval must be at least `min`, and never zero.
pub fn parse_interval(s: &str, min: Duration) -> Result<Duration> {
    let interval = humantime::parse_duration(s.trim())
        .map_err(|e| GatorError::Validation(format!("invalid duration {s:?}: {e}")))?;

    if interval.is_zero() {
        return Err(GatorError::Validation(
            "duration must be greater than zero".to_string(),
        ));
    }
    if interval < min {
        return Err(GatorError::Validation(format!(
            "duration must be at least {}",
            humantime::format_duration(min)
        )));
    }

    Ok(interval)
}

/// Parse a `browse` limit: a positive integer.
pub fn parse_limit(s: &str) -> Result<i64> {
    match s.trim().parse::<i64>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(GatorError::Validation(format!(
            "limit must be a positive integer, got {s:?}"
        ))),
    }
}

fn non_empty<'s>(value: &'s str, what: &str) -> Result<&'s str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GatorError::Validation(format!("{what} must not be empty")));
    }
    Ok(value)
}

fn register<'a>(state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
    async move {
        let args = cmd.expect_args(1, usage("register"))?;
        let name = non_empty(&args[0], "user name")?;

        let user = UserRepository::new(state.db.pool()).create(name).await?;
        state.session.set_current_user(&user.name)?;
        info!(user = %user.name, "Registered user");

        state.ui.line(format!("User created: {}", user.name))?;
        state.ui.field("ID", &user.id)?;
        state.ui.field(
            "Created",
            format_utc_datetime(
                &user.created_at,
                &state.session.config().display.timezone,
                &state.session.config().display.date_format,
            ),
        )
    }
    .boxed()
}

fn login<'a>(state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
    async move {
        let args = cmd.expect_args(1, usage("login"))?;
        let name = non_empty(&args[0], "user name")?;

        let user = UserRepository::new(state.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {name:?}")))?;
        state.session.set_current_user(&user.name)?;

        state.ui.line(format!("Logged in as {}", user.name))
    }
    .boxed()
}

fn reset<'a>(state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
    async move {
        cmd.expect_args(0, usage("reset"))?;

        let deleted = UserRepository::new(state.db.pool()).delete_all().await?;
        warn!(deleted, "Deleted all users");

        state.ui.line(format!("Deleted {deleted} user(s)"))
    }
    .boxed()
}

fn users<'a>(state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
    async move {
        cmd.expect_args(0, usage("users"))?;

        let users = UserRepository::new(state.db.pool()).list().await?;
        if users.is_empty() {
            return state.ui.line("No users yet");
        }

        let current = state.session.current_user_name().map(str::to_string);
        for user in users {
            if current.as_deref() == Some(user.name.as_str()) {
                state.ui.item(format!("{} (current)", user.name))?;
            } else {
                state.ui.item(&user.name)?;
            }
        }
        Ok(())
    }
    .boxed()
}

fn feeds<'a>(state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
    async move {
        cmd.expect_args(0, usage("feeds"))?;

        let feeds = FeedRepository::new(state.db.pool()).list_with_owner().await?;
        if feeds.is_empty() {
            return state.ui.line("No feeds yet");
        }

        for entry in feeds {
            state.ui.item(format!(
                "{} - {} - {}",
                entry.feed.name, entry.feed.url, entry.user_name
            ))?;
        }
        Ok(())
    }
    .boxed()
}

fn list_follows<'a>(state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
    async move {
        cmd.expect_args(0, usage("listfollows"))?;

        let follows = FeedFollowRepository::new(state.db.pool()).list_all().await?;
        if follows.is_empty() {
            return state.ui.line("No follows yet");
        }

        for follow in follows {
            state
                .ui
                .item(format!("{} - {}", follow.user_name, follow.feed_name))?;
        }
        Ok(())
    }
    .boxed()
}

fn add_feed<'a>(state: &'a mut State, cmd: Command, user: User) -> HandlerFuture<'a> {
    async move {
        let args = cmd.expect_args(2, usage("addfeed"))?;
        let name = non_empty(&args[0], "feed name")?;
        let url = args[1].trim();
        validate_url(url)?;

        let feeds = FeedRepository::new(state.db.pool());
        if feeds.get_by_url(url).await?.is_some() {
            return Err(GatorError::Persistence(format!("feed {url:?} already exists")));
        }

        // Reject feeds that cannot be fetched or parsed before storing them.
        let parsed = state.fetcher.fetch(url).await?;
        info!(url, title = %parsed.title, items = parsed.items.len(), "Feed probe succeeded");

        let feed = feeds.create(&NewFeed::new(name, url, &user.id)).await?;
        let follow = FeedFollowRepository::new(state.db.pool())
            .create(&user.id, &feed.id)
            .await?;

        state.ui.line("Feed added:")?;
        state.ui.field("Name", &feed.name)?;
        state.ui.field("URL", &feed.url)?;
        state.ui.field("ID", &feed.id)?;
        state.ui.line(format!(
            "{} now follows {}",
            follow.user_name, follow.feed_name
        ))
    }
    .boxed()
}

fn follow<'a>(state: &'a mut State, cmd: Command, user: User) -> HandlerFuture<'a> {
    async move {
        let args = cmd.expect_args(1, usage("follow"))?;
        let url = args[0].trim();

        let feed = FeedRepository::new(state.db.pool())
            .get_by_url(url)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {url:?}")))?;
        let follow = FeedFollowRepository::new(state.db.pool())
            .create(&user.id, &feed.id)
            .await?;

        state.ui.line(format!(
            "{} now follows {}",
            follow.user_name, follow.feed_name
        ))
    }
    .boxed()
}

fn unfollow<'a>(state: &'a mut State, cmd: Command, user: User) -> HandlerFuture<'a> {
    async move {
        let args = cmd.expect_args(1, usage("unfollow"))?;
        let url = args[0].trim();

        let feed = FeedRepository::new(state.db.pool())
            .get_by_url(url)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {url:?}")))?;
        let removed = FeedFollowRepository::new(state.db.pool())
            .delete(&user.id, &feed.id)
            .await?;
        if !removed {
            return Err(GatorError::NotFound(format!("follow of {url:?}")));
        }

        state
            .ui
            .line(format!("{} unfollowed {}", user.name, feed.name))
    }
    .boxed()
}

fn following<'a>(state: &'a mut State, cmd: Command, user: User) -> HandlerFuture<'a> {
    async move {
        cmd.expect_args(0, usage("following"))?;

        let follows = FeedFollowRepository::new(state.db.pool())
            .list_for_user(&user.id)
            .await?;
        if follows.is_empty() {
            return state.ui.line("Not following any feeds");
        }

        state.ui.line(format!("Feeds followed by {}:", user.name))?;
        for follow in follows {
            state.ui.item(&follow.feed_name)?;
        }
        Ok(())
    }
    .boxed()
}

fn browse<'a>(state: &'a mut State, cmd: Command, user: User) -> HandlerFuture<'a> {
    async move {
        let limit = match cmd.args.as_slice() {
            [] => state.session.config().aggregator.default_browse_limit,
            [limit] => parse_limit(limit)?,
            _ => {
                return Err(GatorError::Validation(format!(
                    "usage: {}",
                    usage("browse")
                )))
            }
        };

        let posts = PostRepository::new(state.db.pool())
            .list_for_user(&user.id, limit)
            .await?;
        if posts.is_empty() {
            return state.ui.line("No posts yet");
        }

        let display = state.session.config().display.clone();
        for entry in posts {
            let published =
                format_utc_datetime(&entry.post.published_at, &display.timezone, &display.date_format);
            state
                .ui
                .line(format!("{published} from {}", entry.feed_name))?;
            state.ui.line(format!("--- {} ---", entry.post.title))?;
            if let Some(description) = &entry.post.description {
                state.ui.line(format!("    {description}"))?;
            }
            if !entry.post.url.is_empty() {
                state.ui.line(format!("Link: {}", entry.post.url))?;
            }
            state.ui.separator()?;
        }
        Ok(())
    }
    .boxed()
}

fn agg<'a>(state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
    async move {
        let args = cmd.expect_args(1, usage("agg"))?;
        let aggregator = &state.session.config().aggregator;
        let period = parse_interval(&args[0], aggregator.min_interval)?;

        let scheduler = FetchScheduler::new(
            state.db.clone(),
            state.fetcher.clone(),
            aggregator.max_concurrent_fetches,
        );

        state.ui.line(format!(
            "Collecting feeds every {}",
            humantime::format_duration(period)
        ))?;
        state.ui.flush()?;

        scheduler.run(period, shutdown_signal()).await;
        Ok(())
    }
    .boxed()
}

/// Completes on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Lists the registered commands.
pub struct HelpCommand {
    names: Vec<String>,
}

impl HelpCommand {
    /// Create a help command listing `names` in the given order.
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    fn render(&self, state: &mut State) -> Result<()> {
        state.ui.line("Usage: gator <command> [args...]")?;
        state.ui.line("")?;
        state.ui.line("Commands:")?;
        for name in &self.names {
            match COMMANDS.iter().find(|(n, _, _)| *n == name.as_str()) {
                Some((_, usage, description)) => {
                    state.ui.item(format!("{usage:<22} {description}"))?
                }
                None => state.ui.item(name)?,
            }
        }
        Ok(())
    }
}

impl CommandHandler for HelpCommand {
    fn call<'a>(&'a self, state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
        async move {
            cmd.expect_args(0, usage("help"))?;
            self.render(state)
        }
        .boxed()
    }
}
