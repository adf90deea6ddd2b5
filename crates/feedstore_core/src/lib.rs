//! Single-record persistent cache for an image feed.
//!
//! A store keeps exactly zero or one cached feed (ordered images plus a
//! timestamp) in SQLite and exposes asynchronous retrieve / insert / delete
//! operations that run serially per store instance.

pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod specs;
pub mod store;

pub use codec::{DecodedFeed, StoredCache, StoredRecord};
pub use config::{ConfigError, StoreConfig, StoreLocation};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::feed::{CachedFeed, FeedImage, FeedImageId};
pub use repo::cache_container::{CacheContainer, RepoError, RepoResult, SqliteCacheContainer};
pub use store::{
    DeletionCompletion, DeletionResult, FeedStore, InsertionCompletion, InsertionResult,
    RetrievalCompletion, RetrievalResult, RetrieveOutcome, SqliteFeedStore, StoreError,
    StoreInitError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
