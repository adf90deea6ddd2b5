//! Store construction configuration.
//!
//! # Responsibility
//! - Describe where a store persists its data.
//! - Reject configurations that can never produce a usable store.
//!
//! # Invariants
//! - A file location must be non-empty and must not name a directory.
//! - Busy timeout is strictly positive.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Physical location of the persisted cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// SQLite database file, shared by every store opened at the same path.
    File(PathBuf),
    /// Private in-memory database, dropped together with its store.
    InMemory,
}

/// Configuration consumed by `SqliteFeedStore::new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// How long a write waits on a lock held by another connection.
    pub busy_timeout: Duration,
}

/// Invalid store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyPath,
    PathIsDirectory(PathBuf),
    ZeroBusyTimeout,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "store path cannot be empty"),
            Self::PathIsDirectory(path) => {
                write!(f, "store path `{}` is a directory", path.display())
            }
            Self::ZeroBusyTimeout => write!(f, "busy timeout must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

impl StoreConfig {
    /// Configuration for a file-backed store at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Configuration for a private in-memory store.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::InMemory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Returns the file path, or `None` for in-memory locations.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            StoreLocation::File(path) => Some(path.as_path()),
            StoreLocation::InMemory => None,
        }
    }

    /// Checks the configuration without touching storage contents.
    ///
    /// # Errors
    /// - `EmptyPath` when the file path is blank.
    /// - `PathIsDirectory` when the file path names an existing directory.
    /// - `ZeroBusyTimeout` when `busy_timeout` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout.is_zero() {
            return Err(ConfigError::ZeroBusyTimeout);
        }

        if let StoreLocation::File(path) = &self.location {
            if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
                return Err(ConfigError::EmptyPath);
            }
            if path.is_dir() {
                return Err(ConfigError::PathIsDirectory(path.clone()));
            }
        }

        Ok(())
    }

    pub(crate) fn mode(&self) -> &'static str {
        match self.location {
            StoreLocation::File(_) => "file",
            StoreLocation::InMemory => "memory",
        }
    }
}
