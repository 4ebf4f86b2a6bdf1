//! Authentication gate for commands that act on behalf of a user.

use futures::FutureExt;

use super::{Command, CommandHandler, HandlerFuture, State};
use crate::db::{User, UserRepository};
use crate::{GatorError, Result};

/// Resolve the session's current user against storage.
pub async fn current_user(state: &State) -> Result<User> {
    let Some(name) = state.session.current_user_name() else {
        return Err(GatorError::Unauthenticated(
            "no current user, run `gator login <name>` first".to_string(),
        ));
    };

    UserRepository::new(state.db.pool())
        .get_by_name(name)
        .await?
        .ok_or_else(|| GatorError::Unauthenticated(format!("user {name:?} does not exist")))
}

/// Wraps a handler that needs the logged-in [`User`].
///
/// The inner handler only runs when the current user resolves.
pub struct LoggedIn<F>(pub F);

impl<F> CommandHandler for LoggedIn<F>
where
    F: for<'a> Fn(&'a mut State, Command, User) -> HandlerFuture<'a> + Send + Sync,
{
    fn call<'a>(&'a self, state: &'a mut State, cmd: Command) -> HandlerFuture<'a> {
        async move {
            let user = current_user(state).await?;
            (self.0)(state, cmd, user).await
        }
        .boxed()
    }
}
