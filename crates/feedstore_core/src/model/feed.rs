//! Feed image and cache aggregate models.
//!
//! # Responsibility
//! - Define the caller-owned `FeedImage` value.
//! - Define `CachedFeed`, the whole persisted state of one store.
//!
//! # Invariants
//! - `FeedImage` values are never mutated after construction.
//! - A `CachedFeed` is replaced as a whole, never merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Stable identifier of one feed image.
pub type FeedImageId = Uuid;

/// Image metadata entry as delivered by the remote feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedImage {
    id: FeedImageId,
    description: Option<String>,
    location: Option<String>,
    url: Url,
}

impl FeedImage {
    pub fn new(
        id: FeedImageId,
        description: Option<String>,
        location: Option<String>,
        url: Url,
    ) -> Self {
        Self {
            id,
            description,
            location,
            url,
        }
    }

    pub fn id(&self) -> FeedImageId {
        self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// The single cache aggregate: an ordered feed plus the instant it was cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFeed {
    pub feed: Vec<FeedImage>,
    pub timestamp: DateTime<Utc>,
}

impl CachedFeed {
    pub fn new(feed: Vec<FeedImage>, timestamp: DateTime<Utc>) -> Self {
        Self { feed, timestamp }
    }

    pub fn is_empty(&self) -> bool {
        self.feed.is_empty()
    }
}
