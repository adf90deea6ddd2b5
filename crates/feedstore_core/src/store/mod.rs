//! Public feed cache store contract.
//!
//! # Responsibility
//! - Define `FeedStore`: retrieve / insert / delete with completion callbacks.
//! - Define operation results and the error taxonomy surfaced to callers.
//!
//! # Invariants
//! - Every completion is invoked exactly once.
//! - Operations issued against one store take effect, and complete, in the
//!   order they were issued.
//! - Operation failures travel through completions; only construction
//!   reports errors synchronously.

use crate::config::ConfigError;
use crate::db::DbError;
use crate::model::feed::FeedImage;
use crate::repo::cache_container::RepoError;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite_store;

pub use sqlite_store::SqliteFeedStore;

/// What a successful retrieve found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrieveOutcome {
    Empty,
    /// `feed` may be shorter than what was inserted when stored records
    /// failed to decode.
    Found {
        feed: Vec<FeedImage>,
        timestamp: DateTime<Utc>,
    },
}

pub type RetrievalResult = Result<RetrieveOutcome, StoreError>;
pub type InsertionResult = Result<(), StoreError>;
pub type DeletionResult = Result<(), StoreError>;

pub type RetrievalCompletion = Box<dyn FnOnce(RetrievalResult) + Send + 'static>;
pub type InsertionCompletion = Box<dyn FnOnce(InsertionResult) + Send + 'static>;
pub type DeletionCompletion = Box<dyn FnOnce(DeletionResult) + Send + 'static>;

/// Single-record feed cache with asynchronous, serially executed operations.
///
/// Completions may run on a thread owned by the store. A completion must not
/// block on another operation of the same store.
pub trait FeedStore: Send + Sync {
    /// Reads the cached feed without mutating it.
    fn retrieve(&self, completion: RetrievalCompletion);

    /// Replaces the whole cache with `feed` and `timestamp`.
    ///
    /// On failure the previous cache is left exactly as it was.
    fn insert(
        &self,
        feed: Vec<FeedImage>,
        timestamp: DateTime<Utc>,
        completion: InsertionCompletion,
    );

    /// Removes the cache. Deleting an empty cache succeeds.
    fn delete_cached_feed(&self, completion: DeletionCompletion);
}

/// Operation-level failure delivered through a completion.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying transaction failed or the stored aggregate is unreadable.
    Repo(RepoError),
    /// The store worker is no longer accepting operations.
    Closed,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Closed => write!(f, "feed store is closed"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Closed => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Store construction failure.
#[derive(Debug)]
pub enum StoreInitError {
    Config(ConfigError),
    /// Storage could not be opened, bootstrapped or migrated.
    Db(DbError),
    /// Opened storage does not have the expected cache schema.
    Repo(RepoError),
    /// Worker thread could not be spawned.
    Worker(std::io::Error),
}

impl Display for StoreInitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid store configuration: {err}"),
            Self::Db(err) => write!(f, "failed to open store: {err}"),
            Self::Repo(err) => write!(f, "failed to open store: {err}"),
            Self::Worker(err) => write!(f, "failed to start store worker: {err}"),
        }
    }
}

impl Error for StoreInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Worker(err) => Some(err),
        }
    }
}

impl From<ConfigError> for StoreInitError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for StoreInitError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for StoreInitError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
