//! Durability across store instances opened at the same file.

use chrono::Utc;
use feedstore_core::specs::{delete_cache, expect_retrieve, insert, unique_image_feed};
use feedstore_core::{RetrieveOutcome, SqliteFeedStore, StoreConfig};
use std::path::PathBuf;
use tempfile::TempDir;

struct Location {
    dir: TempDir,
}

impl Location {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> PathBuf {
        self.dir.path().join("feed-store-integration.sqlite3")
    }

    fn make_store(&self) -> SqliteFeedStore {
        SqliteFeedStore::new(StoreConfig::file(self.path())).unwrap()
    }
}

#[test]
fn retrieve_delivers_empty_on_empty_cache() {
    let location = Location::new();
    let sut = location.make_store();

    expect_retrieve(&sut, &RetrieveOutcome::Empty);
}

#[test]
fn retrieve_delivers_feed_inserted_on_another_instance() {
    let location = Location::new();
    let store_to_insert = location.make_store();
    let store_to_load = location.make_store();
    let feed = unique_image_feed();
    let timestamp = Utc::now();

    insert(&store_to_insert, feed.clone(), timestamp).unwrap();

    expect_retrieve(&store_to_load, &RetrieveOutcome::Found { feed, timestamp });
}

#[test]
fn retrieve_delivers_feed_inserted_before_reopening() {
    let location = Location::new();
    let feed = unique_image_feed();
    let timestamp = Utc::now();

    {
        let store_to_insert = location.make_store();
        insert(&store_to_insert, feed.clone(), timestamp).unwrap();
    }

    let store_to_load = location.make_store();
    expect_retrieve(&store_to_load, &RetrieveOutcome::Found { feed, timestamp });
}

#[test]
fn insert_overrides_feed_inserted_on_another_instance() {
    let location = Location::new();
    let store_to_insert = location.make_store();
    let store_to_override = location.make_store();
    let store_to_load = location.make_store();

    insert(&store_to_insert, unique_image_feed(), Utc::now()).unwrap();

    let latest_feed = unique_image_feed();
    let latest_timestamp = Utc::now();
    insert(&store_to_override, latest_feed.clone(), latest_timestamp).unwrap();

    expect_retrieve(
        &store_to_load,
        &RetrieveOutcome::Found {
            feed: latest_feed,
            timestamp: latest_timestamp,
        },
    );
}

#[test]
fn delete_deletes_feed_inserted_on_another_instance() {
    let location = Location::new();
    let store_to_insert = location.make_store();
    let store_to_delete = location.make_store();
    let store_to_load = location.make_store();

    insert(&store_to_insert, unique_image_feed(), Utc::now()).unwrap();

    delete_cache(&store_to_delete).unwrap();

    expect_retrieve(&store_to_load, &RetrieveOutcome::Empty);
}
