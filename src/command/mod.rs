//! Command dispatch for Gator.
//!
//! A [`Registry`] maps command names to handlers. Handlers receive the
//! process [`State`] and the parsed [`Command`]; handlers that need a
//! logged-in user are wrapped in [`LoggedIn`].

pub mod handlers;
pub mod middleware;

use std::collections::HashMap;

use futures::future::BoxFuture;
use tracing::debug;

use crate::db::Database;
use crate::feed::FeedFetcher;
use crate::session::Session;
use crate::ui::Renderer;
use crate::{GatorError, Result};

pub use handlers::{build_registry, parse_interval, parse_limit, HelpCommand};
pub use middleware::{current_user, LoggedIn};

/// Future returned by a command handler.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<()>>;

/// A command name with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<String>,
}

impl Command {
    /// Create a command.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Build a command from command-line words (program name excluded).
    ///
    /// Returns `None` when there are no words.
    pub fn from_args<I, S>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let name = args.next()?;
        Some(Self::new(name, args.collect()))
    }

    /// Check the argument count, returning the arguments on success.
    pub fn expect_args(&self, count: usize, usage: &str) -> Result<&[String]> {
        if self.args.len() != count {
            return Err(GatorError::Validation(format!("usage: {usage}")));
        }
        Ok(&self.args)
    }
}

/// Everything a command can touch.
#[derive(Debug)]
pub struct State {
    /// Database handle.
    pub db: Database,
    /// Configuration and current user.
    pub session: Session,
    /// Shared feed fetcher.
    pub fetcher: FeedFetcher,
    /// Output sink.
    pub ui: Renderer,
}

impl State {
    /// Create a state from its parts.
    pub fn new(db: Database, session: Session, fetcher: FeedFetcher, ui: Renderer) -> Self {
        Self {
            db,
            session,
            fetcher,
            ui,
        }
    }
}

/// A command handler.
pub trait CommandHandler: Send + Sync {
    /// Run the command.
    fn call<'a>(&'a self, state: &'a mut State, cmd: Command) -> HandlerFuture<'a>;
}

impl<F> CommandHandler for F
where
    F: for<'a> Fn(&'a mut State, Command) -> HandlerFuture<'a> + Send + Sync,
{
    fn call<'a>(&'a self, state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
        self(state, cmd)
    }
}

/// Name to handler mapping, kept in registration order.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
    order: Vec<String>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`.
    ///
    /// The first registration of a name wins; later ones are ignored.
    pub fn register(&mut self, name: &str, handler: impl CommandHandler + 'static) {
        if self.handlers.contains_key(name) {
            debug!(command = name, "Command already registered, ignoring");
            return;
        }
        self.handlers.insert(name.to_string(), Box::new(handler));
        self.order.push(name.to_string());
    }

    /// Whether a handler is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Dispatch `cmd` to its handler and return the handler's result.
    pub async fn run(&self, state: &mut State, cmd: Command) -> Result<()> {
        let Some(handler) = self.handlers.get(&cmd.name) else {
            return Err(GatorError::NotFound(format!("command {:?}", cmd.name)));
        };

        debug!(command = %cmd.name, args = ?cmd.args, "Running command");
        handler.call(state, cmd).await
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.order)
            .finish()
    }
}

#[cfg(all(test, feature = "sqlite"))]
pub(crate) mod test_support {
    use super::*;
    use crate::config::{AggregatorConfig, Config};
    use crate::ui::OutputBuffer;
    use std::time::Duration;

    /// A state over an in-memory database and session, with captured output.
    pub async fn state() -> (State, OutputBuffer) {
        let db = Database::open_in_memory().await.unwrap();
        let fetcher = FeedFetcher::new(&AggregatorConfig {
            request_timeout: Duration::from_secs(2),
            ..AggregatorConfig::default()
        })
        .unwrap();
        let (ui, buffer) = Renderer::buffered();
        let state = State::new(db, Session::in_memory(Config::default()), fetcher, ui);
        (state, buffer)
    }
}
