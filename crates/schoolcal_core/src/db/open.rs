//! Opening calendar databases.
//!
//! # Invariants
//! - A returned connection is fully migrated, has `foreign_keys=ON` and a
//!   bounded busy timeout; no storage call waits on a lock forever.
//! - Lock waits past the timeout surface as `SQLITE_BUSY`, which callers
//!   report as retryable.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Busy timeout used when the caller does not supply one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if needed) a database file with the default timeout.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

/// Opens a database file; lock waits longer than `busy_timeout` fail.
pub fn open_db_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    let path = path.as_ref();
    open_logged("file", busy_timeout, || Connection::open(path))
}

/// Opens a private in-memory database. Used by tests and dry runs.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_logged("memory", DEFAULT_BUSY_TIMEOUT, Connection::open_in_memory)
}

fn open_logged(
    mode: &'static str,
    busy_timeout: Duration,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let result = connect()
        .map_err(Into::into)
        .and_then(|conn| prepare(conn, busy_timeout));

    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} busy_timeout_ms={} duration_ms={}",
            mode,
            busy_timeout.as_millis(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} transient={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            err.is_transient(),
            err
        ),
    }
    result
}

fn prepare(mut conn: Connection, busy_timeout: Duration) -> DbResult<Connection> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}
