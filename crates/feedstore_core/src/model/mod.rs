//! Domain model for the cached image feed.
//!
//! # Responsibility
//! - Define the immutable feed item shared by callers and the store.
//! - Define the single cache aggregate (`feed` + `timestamp`).
//!
//! # Invariants
//! - Every feed item is identified by a `FeedImageId` (UUID).
//! - Feed order is significant and preserved end to end.

pub mod feed;
