//! SQLite feed store backed by one serial worker thread.
//!
//! # Responsibility
//! - Own the store's private SQLite connection for its whole lifetime.
//! - Queue operations in issue order and run them one at a time.
//! - Translate between domain feeds and stored records at the boundary.
//!
//! # Invariants
//! - Only the worker thread touches the connection.
//! - Commands are executed and completed strictly FIFO; the next command
//!   starts only after the previous completion returned.
//! - A panicking completion is contained and does not stop the queue.

use super::{
    DeletionCompletion, FeedStore, InsertionCompletion, RetrievalCompletion, RetrievalResult,
    RetrieveOutcome, StoreError, StoreInitError,
};
use crate::codec::{decode_feed, encode_feed, StoredCache};
use crate::config::StoreConfig;
use crate::db::open_db;
use crate::model::feed::FeedImage;
use crate::repo::cache_container::{CacheContainer, SqliteCacheContainer};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SendError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

const WORKER_THREAD_NAME: &str = "feedstore-worker";

enum Command {
    Retrieve(RetrievalCompletion),
    Insert {
        cache: StoredCache,
        completion: InsertionCompletion,
    },
    Delete(DeletionCompletion),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Retrieve(_) => "cache_retrieve",
            Self::Insert { .. } => "cache_insert",
            Self::Delete(_) => "cache_delete",
        }
    }

    /// Completes the command without running it.
    fn reject(self, err: StoreError) {
        match self {
            Self::Retrieve(completion) => completion(Err(err)),
            Self::Insert { completion, .. } => completion(Err(err)),
            Self::Delete(completion) => completion(Err(err)),
        }
    }
}

/// Feed store persisting its single cache aggregate in SQLite.
///
/// Several instances may point at the same file; each sees the others'
/// committed writes. Ordering is only guaranteed within one instance.
pub struct SqliteFeedStore {
    commands: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl SqliteFeedStore {
    /// Opens the store described by `config`.
    ///
    /// # Errors
    /// - `Config` when `config` fails validation.
    /// - `Db` when the storage cannot be opened, is not a SQLite database,
    ///   or carries a newer schema than supported.
    /// - `Repo` when the opened schema is missing cache tables or columns.
    /// - `Worker` when the worker thread cannot be spawned.
    pub fn new(config: StoreConfig) -> Result<Self, StoreInitError> {
        let started_at = Instant::now();
        let mode = config.mode();
        info!("event=store_open module=store status=start mode={mode}");

        match open_store(&config) {
            Ok(store) => {
                info!(
                    "event=store_open module=store status=ok mode={mode} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(store)
            }
            Err(err) => {
                error!(
                    "event=store_open module=store status=error mode={mode} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn dispatch(&self, command: Command) {
        let Some(commands) = self.commands.as_ref() else {
            command.reject(StoreError::Closed);
            return;
        };

        if let Err(SendError(command)) = commands.send(command) {
            warn!(
                "event={} module=store status=error error_code=store_closed",
                command.name()
            );
            command.reject(StoreError::Closed);
        }
    }
}

impl FeedStore for SqliteFeedStore {
    fn retrieve(&self, completion: RetrievalCompletion) {
        self.dispatch(Command::Retrieve(completion));
    }

    fn insert(
        &self,
        feed: Vec<FeedImage>,
        timestamp: DateTime<Utc>,
        completion: InsertionCompletion,
    ) {
        let cache = encode_feed(&feed, timestamp);
        self.dispatch(Command::Insert { cache, completion });
    }

    fn delete_cached_feed(&self, completion: DeletionCompletion) {
        self.dispatch(Command::Delete(completion));
    }
}

impl Drop for SqliteFeedStore {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain queued commands and exit.
        drop(self.commands.take());

        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            // Dropped from one of its own completions; the worker exits on its own.
            return;
        }
        if worker.join().is_err() {
            error!("event=store_close module=store status=error error_code=worker_panicked");
        }
    }
}

fn open_store(config: &StoreConfig) -> Result<SqliteFeedStore, StoreInitError> {
    config.validate()?;
    let conn = open_db(config)?;
    SqliteCacheContainer::try_new(&conn)?;

    let (sender, receiver) = mpsc::channel();
    let worker = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || run_worker(conn, receiver))
        .map_err(StoreInitError::Worker)?;

    Ok(SqliteFeedStore {
        commands: Some(sender),
        worker: Some(worker),
    })
}

fn run_worker(conn: Connection, commands: Receiver<Command>) {
    debug!("event=store_worker module=store status=start");

    {
        // Schema readiness was checked once in `open_store`.
        let container = SqliteCacheContainer::from_ready(&conn);
        for command in commands {
            let name = command.name();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| execute(&container, command)));
            if outcome.is_err() {
                error!("event={name} module=store status=error error_code=completion_panicked");
            }
        }
    }

    match conn.close() {
        Ok(()) => info!("event=store_close module=store status=ok"),
        Err((_, err)) => error!(
            "event=store_close module=store status=error error_code=db_close_failed error={}",
            err
        ),
    }
}

fn execute(container: &SqliteCacheContainer<'_>, command: Command) {
    let started_at = Instant::now();
    match command {
        Command::Retrieve(completion) => {
            let result = retrieve(container, started_at);
            completion(result);
        }
        Command::Insert { cache, completion } => {
            let items = cache.records.len();
            let result = container.replace(&cache).map_err(StoreError::from);
            log_write("cache_insert", items, started_at, &result);
            completion(result);
        }
        Command::Delete(completion) => {
            let result = container.clear().map_err(StoreError::from);
            log_write("cache_delete", 0, started_at, &result);
            completion(result);
        }
    }
}

fn retrieve(container: &SqliteCacheContainer<'_>, started_at: Instant) -> RetrievalResult {
    match container.current() {
        Ok(None) => {
            info!(
                "event=cache_retrieve module=store status=ok result=empty duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(RetrieveOutcome::Empty)
        }
        Ok(Some(stored)) => {
            let decoded = decode_feed(&stored);
            if decoded.dropped > 0 {
                warn!(
                    "event=cache_retrieve module=store status=partial result=found items={} dropped={} duration_ms={}",
                    decoded.cache.feed.len(),
                    decoded.dropped,
                    started_at.elapsed().as_millis()
                );
            } else {
                info!(
                    "event=cache_retrieve module=store status=ok result=found items={} dropped=0 duration_ms={}",
                    decoded.cache.feed.len(),
                    started_at.elapsed().as_millis()
                );
            }
            Ok(RetrieveOutcome::Found {
                feed: decoded.cache.feed,
                timestamp: decoded.cache.timestamp,
            })
        }
        Err(err) => {
            error!(
                "event=cache_retrieve module=store status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn log_write(event: &str, items: usize, started_at: Instant, result: &Result<(), StoreError>) {
    match result {
        Ok(()) => info!(
            "event={event} module=store status=ok items={items} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=store status=error items={items} duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
}
