//! Per-key serialization of mutations.
//!
//! Two operations on the same cart line (or the same wishlist product) never
//! interleave: the second waits until the first has finished, including its
//! rollback. Operations on different keys run concurrently.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{
    Mutex as AsyncMutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock,
};

/// A set of async locks, one per key, created on demand.
///
/// Entries are held weakly; a key's lock is dropped once no operation holds
/// or waits on it. Waiters are served in FIFO order.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Weak<AsyncMutex<()>>>>,
    gate: Arc<RwLock<()>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            gate: Arc::new(RwLock::new(())),
        }
    }
}

/// Held for the duration of one per-key operation.
#[derive(Debug)]
pub struct KeyGuard {
    _key: OwnedMutexGuard<()>,
    _gate: OwnedRwLockReadGuard<()>,
}

/// Held by an operation that touches every key (e.g. clearing the cart).
#[derive(Debug)]
pub struct AllKeysGuard {
    _gate: OwnedRwLockWriteGuard<()>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> KeyGuard {
        let gate = Arc::clone(&self.gate).read_owned().await;
        let mutex = self.entry(key);
        KeyGuard {
            _key: mutex.lock_owned().await,
            _gate: gate,
        }
    }

    /// Wait until no per-key operation is running, and block new ones.
    pub async fn lock_all(&self) -> AllKeysGuard {
        AllKeysGuard {
            _gate: Arc::clone(&self.gate).write_owned().await,
        }
    }

    fn entry(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = locks.get(key).and_then(Weak::upgrade) {
            return existing;
        }
        locks.retain(|_, weak| weak.strong_count() > 0);
        let fresh = Arc::new(AsyncMutex::new(()));
        locks.insert(key.clone(), Arc::downgrade(&fresh));
        fresh
    }

    /// Number of keys with a live lock.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

/// Outcome of pushing device-local state to the server after sign-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Entries the server accepted.
    pub pushed: usize,
    /// Entries the server refused; they stay out of the merged state.
    pub failed: usize,
}

impl MergeSummary {
    pub(crate) fn record(&mut self, ok: bool) {
        if ok {
            self.pushed += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::<String>::new());
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = Arc::clone(&locks);
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(&"p1/s1".to_string()).await;
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::<&str>::new();
        let _a = locks.lock(&"a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(&"b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_lock_all_waits_for_key_holders() {
        let locks = KeyedLocks::<&str>::new();
        let guard = locks.lock(&"a").await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock_all()).await;
        assert!(blocked.is_err());
        drop(guard);
        let all = tokio::time::timeout(Duration::from_millis(100), locks.lock_all()).await;
        assert!(all.is_ok());
    }

    #[tokio::test]
    async fn test_idle_locks_are_released() {
        let locks = KeyedLocks::<&str>::new();
        {
            let _guard = locks.lock(&"a").await;
            assert_eq!(locks.active_keys(), 1);
        }
        assert_eq!(locks.active_keys(), 0);
    }
}
