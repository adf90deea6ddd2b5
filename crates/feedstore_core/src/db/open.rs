//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections for a feed store.
//! - Configure connection pragmas required by cache behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` (image rows cascade with
//!   their cache row).
//! - Returned connections have migrations fully applied.
//! - Files that are not SQLite databases fail here, not on first use.

use super::migrations::apply_migrations;
use super::DbResult;
use crate::config::{StoreConfig, StoreLocation};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens the connection described by `config` and applies pending migrations.
///
/// Does not validate `config`; callers run `StoreConfig::validate` first.
pub fn open_db(config: &StoreConfig) -> DbResult<Connection> {
    match &config.location {
        StoreLocation::File(path) => open_db_file(path, config.busy_timeout),
        StoreLocation::InMemory => {
            open_with("memory", config.busy_timeout, Connection::open_in_memory)
        }
    }
}

/// Opens (or creates) a SQLite database file and applies pending migrations.
///
/// # Side effects
/// - Creates the file when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_file(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    open_with("file", busy_timeout, || Connection::open(path))
}

/// Opens a private in-memory SQLite database and applies pending migrations.
///
/// Uses a 5 s busy timeout; `open_db` applies the configured one instead.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Duration::from_secs(5), Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    busy_timeout: Duration,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, busy_timeout) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    apply_migrations(conn)?;
    Ok(())
}
