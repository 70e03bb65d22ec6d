//! Single-flight guard for identical concurrent requests.
//!
//! Two requests for the same cache key serialize on a per-key async
//! mutex, so the second observes the first's committed cache write
//! instead of fetching again. Entries are evicted when the last holder
//! releases, keeping the key map bounded on long-running servers.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockscope_market_data::CacheKey;

type LockMap = Arc<DashMap<String, Arc<Mutex<()>>>>;

#[derive(Clone, Default)]
pub struct FlightGuard {
    locks: LockMap,
}

/// Exclusive hold on one cache key, released on drop.
pub struct FlightPermit {
    key: String,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold their own Arc clone of the lock, so a strong
        // count of one means nobody else references this entry.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl FlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the per-key lock; held for the duration of one
    /// resolve-and-fetch.
    pub async fn acquire(&self, key: &CacheKey) -> FlightPermit {
        let storage_key = key.storage_key();
        let lock = self
            .locks
            .entry(storage_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        FlightPermit {
            key: storage_key,
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stockscope_market_data::Symbol;

    #[tokio::test]
    async fn same_key_serializes_different_keys_do_not() {
        let guard = FlightGuard::new();
        let symbol = Symbol::parse("AAPL").unwrap();
        let key = CacheKey::fundamentals("yahoo", &symbol);
        let other = CacheKey::news("yahoo", &symbol, 7);

        let held = guard.acquire(&key).await;

        // A different key is immediately available.
        let _other = tokio::time::timeout(Duration::from_millis(10), guard.acquire(&other))
            .await
            .expect("other key must not block");

        // The same key blocks until release.
        let acquired =
            tokio::time::timeout(Duration::from_millis(10), guard.acquire(&key)).await;
        assert!(acquired.is_err());

        drop(held);
        let _reacquired = tokio::time::timeout(Duration::from_millis(100), guard.acquire(&key))
            .await
            .expect("lock must be free after drop");
    }

    #[tokio::test]
    async fn entries_are_evicted_once_released() {
        let guard = FlightGuard::new();
        let symbol = Symbol::parse("AAPL").unwrap();
        let key = CacheKey::fundamentals("yahoo", &symbol);

        let held = guard.acquire(&key).await;
        assert_eq!(guard.locks.len(), 1);

        let contender = {
            let guard = guard.clone();
            let key = key.clone();
            tokio::spawn(async move { guard.acquire(&key).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Releasing with a waiter present keeps the entry alive for it.
        drop(held);
        let permit = contender.await.unwrap();
        assert_eq!(guard.locks.len(), 1);

        drop(permit);
        assert_eq!(guard.locks.len(), 0);
    }
}
