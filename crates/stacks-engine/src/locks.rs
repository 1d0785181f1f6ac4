//! # Keyed Locks
//!
//! One async mutex per key, created on first use.
//!
//! ## Scopes Used by the Coordinator
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Per-ISBN Lock Scopes                              │
//! │                                                                         │
//! │   queue  ["B001"] ──► enqueue / cancel / return hand-off / holds       │
//! │   copies ["B001"] ──► borrow, return, copy registration                │
//! │                                                                         │
//! │   queue  ["B002"]     Different ISBNs never share a mutex, so a        │
//! │   copies ["B002"]     renumbering storm on B001 leaves B002 alone.     │
//! │                                                                         │
//! │   Order: queue before copies, always. Never the other way round.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Guards are owned so they can be held across `.await` points in the
//! coordinator without borrowing the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

/// Idle entries are pruned once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 1024;

/// Registry of async mutexes keyed by string.
#[derive(Debug)]
pub struct KeyedLocks {
    scope: &'static str,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    /// Creates an empty registry. `scope` only labels trace output.
    pub fn new(scope: &'static str) -> Self {
        KeyedLocks {
            scope,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self.mutex_for(key);
        trace!(scope = self.scope, key = %key, "Waiting for lock");
        let guard = mutex.lock_owned().await;
        trace!(scope = self.scope, key = %key, "Lock acquired");
        guard
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mutex_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        // The std mutex is only held for the map lookup, never across an await.
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        if locks.len() >= PRUNE_THRESHOLD {
            // Only the map holds a reference: nobody is waiting or locked.
            locks.retain(|_, m| Arc::strong_count(m) > 1);
        }

        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_excludes() {
        let locks = Arc::new(KeyedLocks::new("test"));
        let held = locks.lock("B001").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("B001").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let locks = KeyedLocks::new("test");
        let _b001 = locks.lock("B001").await;

        let b002 = tokio::time::timeout(Duration::from_millis(100), locks.lock("B002")).await;
        assert!(b002.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = KeyedLocks::new("test");
        let _held = locks.lock("held").await;

        // The last insertion finds the map full and prunes first
        for i in 0..PRUNE_THRESHOLD {
            drop(locks.lock(&format!("isbn-{i}")).await);
        }

        // The held key and the newest entry remain
        assert_eq!(locks.len(), 2);
    }
}
