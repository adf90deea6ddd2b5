//! Persistence layer for the single cache aggregate.
//!
//! # Responsibility
//! - Define the cache container contract (`replace`, `clear`, `current`).
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Zero or one aggregate exists after every completed container call.
//! - Every mutation runs inside one transaction; failures roll back.

pub mod cache_container;
