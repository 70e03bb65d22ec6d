//! Single-writer actor owning the SQLite connection.
//!
//! All operations, reads included, are jobs sent over an mpsc channel and
//! executed serially on one dedicated thread. A `Put` reply is only sent
//! after the statement committed, so a following `Get` on any handle
//! observes the write.

use log::{debug, error};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::{mpsc, oneshot};

use crate::errors::StoreError;

const CHANNEL_CAPACITY: usize = 1024;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache_entries (
    key        TEXT PRIMARY KEY,
    source     TEXT NOT NULL,
    symbol     TEXT NOT NULL,
    kind       TEXT NOT NULL,
    payload    TEXT NOT NULL,
    stored_at  TEXT NOT NULL
);
";

/// A stored row as the caller sees it.
#[derive(Clone, Debug)]
pub struct StoredEntry {
    pub payload: String,
    pub stored_at: String,
}

pub(crate) enum Job {
    Get {
        key: String,
        reply: oneshot::Sender<Result<Option<StoredEntry>, StoreError>>,
    },
    Put {
        key: String,
        source: String,
        symbol: String,
        kind: String,
        payload: String,
        stored_at: String,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Invalidate {
        key: String,
        reply: oneshot::Sender<Result<bool, StoreError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Spawn the writer thread around an open connection.
///
/// The thread exits on a `Shutdown` job or when every sender handle is
/// dropped, closing the connection with it.
pub(crate) fn spawn_writer(conn: Connection) -> Result<mpsc::Sender<Job>, StoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.execute_batch(SCHEMA)?;

    let (tx, mut rx) = mpsc::channel::<Job>(CHANNEL_CAPACITY);

    std::thread::spawn(move || {
        while let Some(job) = rx.blocking_recv() {
            match job {
                Job::Get { key, reply } => {
                    let result = get_entry(&conn, &key);
                    let _ = reply.send(result);
                }
                Job::Put {
                    key,
                    source,
                    symbol,
                    kind,
                    payload,
                    stored_at,
                    reply,
                } => {
                    let result = conn
                        .execute(
                            "INSERT OR REPLACE INTO cache_entries
                             (key, source, symbol, kind, payload, stored_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                            params![key, source, symbol, kind, payload, stored_at],
                        )
                        .map(|_| ())
                        .map_err(StoreError::from);
                    if let Err(ref e) = result {
                        error!("Cache put failed for '{}': {}", key, e);
                    }
                    let _ = reply.send(result);
                }
                Job::Invalidate { key, reply } => {
                    let result = conn
                        .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                        .map(|rows| rows > 0)
                        .map_err(StoreError::from);
                    let _ = reply.send(result);
                }
                Job::Shutdown { reply } => {
                    let _ = reply.send(());
                    break;
                }
            }
        }
        debug!("Cache store writer thread exiting");
    });

    Ok(tx)
}

fn get_entry(conn: &Connection, key: &str) -> Result<Option<StoredEntry>, StoreError> {
    conn.query_row(
        "SELECT payload, stored_at FROM cache_entries WHERE key = ?1",
        params![key],
        |row| {
            Ok(StoredEntry {
                payload: row.get(0)?,
                stored_at: row.get(1)?,
            })
        },
    )
    .optional()
    .map_err(StoreError::from)
}
