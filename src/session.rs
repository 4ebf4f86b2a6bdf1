//! Current-user session for Gator.
//!
//! The session is loaded once at process start and handed to every command
//! through [`crate::command::State`]. Changing the current user rewrites the
//! config file straight away.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::{GatorError, Result};

/// Explicit holder of the configuration and the current user pointer.
///
/// `config` is what commands see, with environment overrides applied.
/// `stored` mirrors the file and is the only copy ever written back.
#[derive(Debug, Clone)]
pub struct Session {
    config: Config,
    stored: Config,
    path: Option<PathBuf>,
}

impl Session {
    /// Create a session backed by the config file at `path`.
    pub fn new(config: Config, path: impl Into<PathBuf>) -> Self {
        Self {
            stored: config.clone(),
            config,
            path: Some(path.into()),
        }
    }

    /// Create a session that is never written to disk.
    pub fn in_memory(config: Config) -> Self {
        Self {
            stored: config.clone(),
            config,
            path: None,
        }
    }

    /// Load the session from the config file at `path` (defaults when missing).
    ///
    /// Environment overrides apply to this run only.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, Config::apply_env_overrides)
    }

    /// Load the session from `path` and adjust the effective config with
    /// `overrides`, leaving the file contents untouched.
    pub fn load_with(
        path: impl AsRef<Path>,
        overrides: impl FnOnce(&mut Config),
    ) -> Result<Self> {
        let path = path.as_ref();
        let stored = Config::load_or_default(path)?;
        let mut config = stored.clone();
        overrides(&mut config);
        config.validate()?;
        Ok(Self {
            config,
            stored,
            path: Some(path.to_path_buf()),
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get the current user name.
    pub fn current_user_name(&self) -> Option<&str> {
        self.config
            .current_user_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    /// Set the current user and persist it.
    pub fn set_current_user(&mut self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(GatorError::Validation("user name is empty".to_string()));
        }

        self.config.current_user_name = Some(name.to_string());
        self.stored.current_user_name = Some(name.to_string());
        if let Some(path) = &self.path {
            self.stored.save(path)?;
            debug!("Current user set to {} in {:?}", name, path);
        }
        Ok(())
    }
}
