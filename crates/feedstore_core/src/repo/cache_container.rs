//! Cache container contract and SQLite implementation.
//!
//! # Responsibility
//! - Store, replace and clear the single `StoredCache` aggregate.
//! - Read it back in insertion order.
//!
//! # Invariants
//! - `feed_cache` holds at most one row (`id = 1`, enforced by schema).
//! - `replace` deletes and writes inside one immediate transaction; a failed
//!   write leaves the previous aggregate untouched.
//! - `current` reads the cache row and its images from one snapshot.

use crate::codec::{StoredCache, StoredRecord};
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use chrono::DateTime;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CACHE_ROW_ID: i64 = 1;

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("feed_cache", &["id", "timestamp_secs", "timestamp_nanos"]),
    (
        "feed_cache_images",
        &["cache_id", "position", "id", "description", "location", "url"],
    ),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Cache container error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Connection schema version does not match this binary.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted aggregate cannot be read back.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "cache container requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "cache container requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "cache container requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted cache data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Single-slot container for the persisted cache aggregate.
pub trait CacheContainer {
    /// Destroys any existing aggregate and stores `cache` atomically.
    fn replace(&self, cache: &StoredCache) -> RepoResult<()>;
    /// Destroys any existing aggregate. Succeeds when nothing is stored.
    fn clear(&self) -> RepoResult<()>;
    /// Returns the live aggregate, or `None` when empty.
    fn current(&self) -> RepoResult<Option<StoredCache>>;
}

/// SQLite-backed cache container.
pub struct SqliteCacheContainer<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCacheContainer<'conn> {
    /// Creates a container from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_cache_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already accepted by `try_new`.
    pub(crate) fn from_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CacheContainer for SqliteCacheContainer<'_> {
    fn replace(&self, cache: &StoredCache) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        delete_all(&tx)?;

        tx.execute(
            "INSERT INTO feed_cache (id, timestamp_secs, timestamp_nanos)
             VALUES (?1, ?2, ?3);",
            params![
                CACHE_ROW_ID,
                cache.timestamp.timestamp(),
                cache.timestamp.timestamp_subsec_nanos(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO feed_cache_images (
                    cache_id,
                    position,
                    id,
                    description,
                    location,
                    url
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            )?;
            for (position, record) in cache.records.iter().enumerate() {
                stmt.execute(params![
                    CACHE_ROW_ID,
                    position as i64,
                    record.id.as_str(),
                    record.description.as_deref(),
                    record.location.as_deref(),
                    record.url.as_str(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        delete_all(&tx)?;
        tx.commit()?;
        Ok(())
    }

    fn current(&self) -> RepoResult<Option<StoredCache>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;

        let cache_rows = {
            let mut stmt = tx.prepare("SELECT id, timestamp_secs, timestamp_nanos FROM feed_cache;")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let (cache_id, secs, nanos) = match cache_rows.as_slice() {
            [] => return Ok(None),
            [row] => *row,
            rows => {
                return Err(RepoError::InvalidData(format!(
                    "expected at most one cache row, found {}",
                    rows.len()
                )));
            }
        };

        let timestamp = DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{secs}.{nanos:09}` in feed_cache"
            ))
        })?;

        let records = {
            let mut stmt = tx.prepare(
                "SELECT id, description, location, url
                 FROM feed_cache_images
                 WHERE cache_id = ?1
                 ORDER BY position ASC;",
            )?;
            let rows = stmt.query_map([cache_id], |row| {
                Ok(StoredRecord {
                    id: row.get(0)?,
                    description: row.get(1)?,
                    location: row.get(2)?,
                    url: row.get(3)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        tx.commit()?;
        Ok(Some(StoredCache { records, timestamp }))
    }
}

fn delete_all(conn: &Connection) -> RepoResult<()> {
    conn.execute("DELETE FROM feed_cache_images;", [])?;
    conn.execute("DELETE FROM feed_cache;", [])?;
    Ok(())
}

fn ensure_cache_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{CacheContainer, RepoError, SqliteCacheContainer};
    use crate::db::open_db_in_memory;
    use rusqlite::Connection;

    #[test]
    fn from_ready_skips_schema_checks() {
        let bare = Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteCacheContainer::try_new(&bare),
            Err(RepoError::UninitializedConnection { .. })
        ));
        let _unchecked = SqliteCacheContainer::from_ready(&bare);

        let migrated = open_db_in_memory().unwrap();
        SqliteCacheContainer::try_new(&migrated).unwrap();
        let container = SqliteCacheContainer::from_ready(&migrated);
        container.clear().unwrap();
        assert_eq!(container.current().unwrap(), None);
    }
}
