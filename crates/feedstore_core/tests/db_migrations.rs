use feedstore_core::db::migrations::latest_version;
use feedstore_core::db::{open_db, open_db_file, open_db_in_memory, DbError};
use feedstore_core::StoreConfig;
use rusqlite::Connection;
use std::time::Duration;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "feed_cache");
    assert_table_exists(&conn, "feed_cache_images");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("feed.sqlite3"));

    let conn_first = open_db(&config).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&config).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "feed_cache");
}

#[test]
fn opened_connection_enforces_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn open_db_applies_configured_busy_timeout_in_memory() {
    let config = StoreConfig::in_memory().with_busy_timeout(Duration::from_millis(250));
    let conn = open_db(&config).unwrap();

    let busy_timeout: i64 = conn
        .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(busy_timeout, 250);
}

#[test]
fn migrating_over_conflicting_cache_table_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conflict.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE feed_cache (payload BLOB);")
        .unwrap();
    drop(conn);

    let err = open_db_file(&path, Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
}

#[test]
fn schema_allows_only_one_cache_row() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO feed_cache (id, timestamp_secs, timestamp_nanos) VALUES (1, 0, 0);",
        [],
    )
    .unwrap();

    let err = conn
        .execute(
            "INSERT INTO feed_cache (id, timestamp_secs, timestamp_nanos) VALUES (2, 0, 0);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("CHECK"));
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db_file(&path, Duration::from_secs(1)).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_non_database_file_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.sqlite3");
    std::fs::write(&path, vec![0xAB_u8; 4096]).unwrap();

    let err = open_db_file(&path, Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
