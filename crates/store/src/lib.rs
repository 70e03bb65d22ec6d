//! Stockscope Cache Store
//!
//! Durable key/value cache for normalized records, backed by a SQLite
//! file behind a single-writer actor. One row per cache key, last write
//! wins, no TTL; freshness policy lives with the callers.

mod actor;
mod errors;

use std::path::Path;

use chrono::Utc;
use log::debug;
use rusqlite::Connection;
use tokio::sync::{mpsc, oneshot};

use stockscope_market_data::{CacheKey, NormalizedRecord};

use actor::Job;
pub use actor::StoredEntry;
pub use errors::StoreError;

/// Handle to the cache store. Cheap to clone; all clones share one
/// writer actor and one connection.
#[derive(Clone)]
pub struct CacheStore {
    tx: mpsc::Sender<Job>,
}

impl CacheStore {
    /// Open (or create) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let tx = actor::spawn_writer(conn)?;
        Ok(Self { tx })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let tx = actor::spawn_writer(conn)?;
        Ok(Self { tx })
    }

    /// Fetch the record stored under `key`, if any.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<NormalizedRecord>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Job::Get {
            key: key.storage_key(),
            reply,
        })
        .await?;
        let entry = recv(rx).await??;

        match entry {
            Some(row) => {
                let record: NormalizedRecord = serde_json::from_str(&row.payload)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Store `record` under `key`, replacing any previous row.
    ///
    /// Returns only after the row is committed.
    pub async fn put(&self, key: &CacheKey, record: &NormalizedRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record)?;
        debug!("Caching {} ({} bytes)", key.storage_key(), payload.len());

        let (reply, rx) = oneshot::channel();
        self.send(Job::Put {
            key: key.storage_key(),
            source: key.source.clone(),
            symbol: key.symbol.clone(),
            kind: key.kind.clone(),
            payload,
            stored_at: Utc::now().to_rfc3339(),
            reply,
        })
        .await?;
        recv(rx).await?
    }

    /// Drop the row under `key`. Returns whether a row existed.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Job::Invalidate {
            key: key.storage_key(),
            reply,
        })
        .await?;
        recv(rx).await?
    }

    /// Shut the writer actor down, closing the connection.
    ///
    /// Jobs still queued are dropped and every later operation on any
    /// clone of this handle reports [`StoreError::Closed`].
    pub async fn close(&self) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Job::Shutdown { reply }).await?;
        recv(rx).await
    }

    async fn send(&self, job: Job) -> Result<(), StoreError> {
        self.tx.send(job).await.map_err(|_| StoreError::Closed)
    }
}

async fn recv<T>(rx: oneshot::Receiver<T>) -> Result<T, StoreError> {
    rx.await.map_err(|_| StoreError::Closed)
}
