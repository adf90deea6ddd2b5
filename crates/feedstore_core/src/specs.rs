//! Reusable behavioral contract for `FeedStore` implementations.
//!
//! Each `assert_that_*` function exercises one property every conforming
//! store must satisfy and panics with a descriptive message when it does not.
//! Run them against a store backed by a clean location.
//!
//! # Invariants
//! - Helpers block on completions with `COMPLETION_TIMEOUT`; a store that
//!   never completes fails the assertion instead of hanging the suite.

use crate::model::feed::FeedImage;
use crate::store::{
    DeletionResult, FeedStore, InsertionResult, RetrievalResult, RetrieveOutcome,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::mpsc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds a feed image with a fresh id and url.
pub fn unique_image() -> FeedImage {
    let id = Uuid::new_v4();
    let url = Url::parse(&format!("https://any-url.com/images/{id}"))
        .expect("generated url should parse");
    FeedImage::new(id, Some("any".to_string()), Some("any".to_string()), url)
}

/// Builds a two-item feed covering present and absent optional fields.
pub fn unique_image_feed() -> Vec<FeedImage> {
    let bare_id = Uuid::new_v4();
    let bare = FeedImage::new(
        bare_id,
        None,
        None,
        Url::parse(&format!("https://another-url.com/{bare_id}?size=small"))
            .expect("generated url should parse"),
    );
    vec![unique_image(), bare]
}

/// Issues a retrieve and waits for its completion.
pub fn retrieve(store: &dyn FeedStore) -> RetrievalResult {
    let (sender, receiver) = mpsc::channel();
    store.retrieve(Box::new(move |result| {
        let _ = sender.send(result);
    }));
    receiver
        .recv_timeout(COMPLETION_TIMEOUT)
        .expect("retrieve should complete in time")
}

/// Issues an insert and waits for its completion.
pub fn insert(
    store: &dyn FeedStore,
    feed: Vec<FeedImage>,
    timestamp: DateTime<Utc>,
) -> InsertionResult {
    let (sender, receiver) = mpsc::channel();
    store.insert(
        feed,
        timestamp,
        Box::new(move |result| {
            let _ = sender.send(result);
        }),
    );
    receiver
        .recv_timeout(COMPLETION_TIMEOUT)
        .expect("insert should complete in time")
}

/// Issues a delete and waits for its completion.
pub fn delete_cache(store: &dyn FeedStore) -> DeletionResult {
    let (sender, receiver) = mpsc::channel();
    store.delete_cached_feed(Box::new(move |result| {
        let _ = sender.send(result);
    }));
    receiver
        .recv_timeout(COMPLETION_TIMEOUT)
        .expect("delete should complete in time")
}

/// Asserts that one retrieve yields `expected`.
pub fn expect_retrieve(store: &dyn FeedStore, expected: &RetrieveOutcome) {
    match retrieve(store) {
        Ok(outcome) => assert_eq!(&outcome, expected, "unexpected retrieve outcome"),
        Err(err) => panic!("expected {expected:?}, got error: {err}"),
    }
}

/// Asserts that two consecutive retrieves both yield `expected`.
pub fn expect_retrieve_twice(store: &dyn FeedStore, expected: &RetrieveOutcome) {
    expect_retrieve(store, expected);
    expect_retrieve(store, expected);
}

fn insert_ok(store: &dyn FeedStore, feed: Vec<FeedImage>, timestamp: DateTime<Utc>) {
    if let Err(err) = insert(store, feed, timestamp) {
        panic!("expected insert to succeed, got error: {err}");
    }
}

fn delete_ok(store: &dyn FeedStore) {
    if let Err(err) = delete_cache(store) {
        panic!("expected delete to succeed, got error: {err}");
    }
}

fn found(feed: Vec<FeedImage>, timestamp: DateTime<Utc>) -> RetrieveOutcome {
    RetrieveOutcome::Found { feed, timestamp }
}

pub fn assert_that_retrieve_delivers_empty_on_empty_cache(store: &dyn FeedStore) {
    expect_retrieve(store, &RetrieveOutcome::Empty);
}

pub fn assert_that_retrieve_has_no_side_effects_on_empty_cache(store: &dyn FeedStore) {
    expect_retrieve_twice(store, &RetrieveOutcome::Empty);
}

pub fn assert_that_retrieve_delivers_found_values_on_non_empty_cache(store: &dyn FeedStore) {
    let feed = unique_image_feed();
    let timestamp = Utc::now();

    insert_ok(store, feed.clone(), timestamp);

    expect_retrieve(store, &found(feed, timestamp));
}

pub fn assert_that_retrieve_has_no_side_effects_on_non_empty_cache(store: &dyn FeedStore) {
    let feed = unique_image_feed();
    let timestamp = Utc::now();

    insert_ok(store, feed.clone(), timestamp);

    expect_retrieve_twice(store, &found(feed, timestamp));
}

pub fn assert_that_insert_delivers_no_error_on_empty_cache(store: &dyn FeedStore) {
    let result = insert(store, unique_image_feed(), Utc::now());
    assert!(
        result.is_ok(),
        "expected to insert cache successfully, got {result:?}"
    );
}

pub fn assert_that_insert_delivers_no_error_on_non_empty_cache(store: &dyn FeedStore) {
    insert_ok(store, unique_image_feed(), Utc::now());

    let result = insert(store, unique_image_feed(), Utc::now());
    assert!(
        result.is_ok(),
        "expected to override cache successfully, got {result:?}"
    );
}

pub fn assert_that_insert_overrides_previously_inserted_cache_values(store: &dyn FeedStore) {
    insert_ok(store, unique_image_feed(), Utc::now());

    let latest_feed = unique_image_feed();
    let latest_timestamp = Utc::now();
    insert_ok(store, latest_feed.clone(), latest_timestamp);

    expect_retrieve(store, &found(latest_feed, latest_timestamp));
}

pub fn assert_that_delete_delivers_no_error_on_empty_cache(store: &dyn FeedStore) {
    let result = delete_cache(store);
    assert!(
        result.is_ok(),
        "expected empty cache deletion to succeed, got {result:?}"
    );
}

pub fn assert_that_delete_has_no_side_effects_on_empty_cache(store: &dyn FeedStore) {
    delete_ok(store);

    expect_retrieve(store, &RetrieveOutcome::Empty);
}

pub fn assert_that_delete_delivers_no_error_on_non_empty_cache(store: &dyn FeedStore) {
    insert_ok(store, unique_image_feed(), Utc::now());

    let result = delete_cache(store);
    assert!(
        result.is_ok(),
        "expected non-empty cache deletion to succeed, got {result:?}"
    );
}

pub fn assert_that_delete_empties_previously_inserted_cache(store: &dyn FeedStore) {
    insert_ok(store, unique_image_feed(), Utc::now());

    delete_ok(store);

    expect_retrieve(store, &RetrieveOutcome::Empty);
}

#[derive(Debug)]
enum Completed {
    Insert(&'static str, InsertionResult),
    Delete(&'static str, DeletionResult),
    Retrieve(&'static str, RetrievalResult),
}

impl Completed {
    fn label(&self) -> &'static str {
        match self {
            Self::Insert(label, _) | Self::Delete(label, _) | Self::Retrieve(label, _) => label,
        }
    }
}

/// Issues insert, delete, insert, retrieve without waiting in between and
/// checks that completions arrive in issue order with the last insert visible.
pub fn assert_that_side_effects_run_serially(store: &dyn FeedStore) {
    let (sender, receiver) = mpsc::channel();
    let latest_feed = unique_image_feed();
    let latest_timestamp = Utc::now();

    let op1 = sender.clone();
    store.insert(
        unique_image_feed(),
        latest_timestamp - ChronoDuration::seconds(1),
        Box::new(move |result| {
            let _ = op1.send(Completed::Insert("operation 1", result));
        }),
    );
    let op2 = sender.clone();
    store.delete_cached_feed(Box::new(move |result| {
        let _ = op2.send(Completed::Delete("operation 2", result));
    }));
    let op3 = sender.clone();
    store.insert(
        latest_feed.clone(),
        latest_timestamp,
        Box::new(move |result| {
            let _ = op3.send(Completed::Insert("operation 3", result));
        }),
    );
    store.retrieve(Box::new(move |result| {
        let _ = sender.send(Completed::Retrieve("operation 4", result));
    }));

    let completed = (0..4)
        .map(|_| {
            receiver
                .recv_timeout(COMPLETION_TIMEOUT)
                .expect("every operation should complete in time")
        })
        .collect::<Vec<_>>();

    let order = completed.iter().map(Completed::label).collect::<Vec<_>>();
    assert_eq!(
        order,
        vec!["operation 1", "operation 2", "operation 3", "operation 4"],
        "expected side-effects to run serially but operations finished in the wrong order"
    );

    for entry in completed {
        match entry {
            Completed::Insert(label, result) => {
                assert!(result.is_ok(), "{label} failed: {result:?}")
            }
            Completed::Delete(label, result) => {
                assert!(result.is_ok(), "{label} failed: {result:?}")
            }
            Completed::Retrieve(_, result) => match result {
                Ok(outcome) => {
                    assert_eq!(outcome, found(latest_feed.clone(), latest_timestamp))
                }
                Err(err) => panic!("retrieve failed: {err}"),
            },
        }
    }
}

/// Issues a write from one thread, then a later write and a retrieve from
/// another thread, and checks the retrieve observes the later write only.
pub fn assert_that_operations_from_concurrent_callers_run_in_issue_order(store: &dyn FeedStore) {
    let first_feed = unique_image_feed();
    let second_feed = unique_image_feed();
    let timestamp = Utc::now();
    let issued = Barrier::new(2);
    let (sender, receiver) = mpsc::channel();

    thread::scope(|scope| {
        let first_sender = sender.clone();
        let first_feed = first_feed.clone();
        let issued = &issued;
        scope.spawn(move || {
            store.insert(
                first_feed,
                timestamp,
                Box::new(move |result| {
                    let _ = first_sender.send(Completed::Insert("first caller", result));
                }),
            );
            issued.wait();
        });

        let second_feed = second_feed.clone();
        scope.spawn(move || {
            issued.wait();
            let insert_sender = sender.clone();
            store.insert(
                second_feed,
                timestamp,
                Box::new(move |result| {
                    let _ = insert_sender.send(Completed::Insert("second caller", result));
                }),
            );
            store.retrieve(Box::new(move |result| {
                let _ = sender.send(Completed::Retrieve("second caller retrieve", result));
            }));
        });
    });

    let completed = (0..3)
        .map(|_| {
            receiver
                .recv_timeout(COMPLETION_TIMEOUT)
                .expect("every operation should complete in time")
        })
        .collect::<Vec<_>>();
    let order = completed.iter().map(Completed::label).collect::<Vec<_>>();
    assert_eq!(
        order,
        vec!["first caller", "second caller", "second caller retrieve"]
    );

    match completed.into_iter().last() {
        Some(Completed::Retrieve(_, Ok(outcome))) => {
            assert_eq!(outcome, found(second_feed, timestamp));
        }
        other => panic!("expected a successful retrieve, got {other:?}"),
    }
}
