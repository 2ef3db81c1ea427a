//! Per-identifier writer locks
//!
//! Sharded table of async mutexes keyed by identifier. Entries are created on first use and
//! removed again once the last guard or waiter for a key is gone, so the table only ever
//! holds identifiers with an upload or finalize in flight.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One identifier's mutex plus the number of guards and waiters registered for it.
struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    users: usize,
}

type Shard = Mutex<HashMap<String, Slot>>;

#[derive(Clone)]
pub struct KeyedLocks {
    shards: Arc<Vec<Shard>>,
}

impl KeyedLocks {
    /// Create a lock table with the default shard count (16 shards)
    pub fn new() -> Self {
        Self::with_shards(16)
    }

    pub fn with_shards(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards: Arc::new(shards),
        }
    }

    fn shard(&self, key: &str) -> MutexGuard<'_, HashMap<String, Slot>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        // The map stays consistent even if a holder panicked.
        self.shards[index]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits until no other guard for `key` is alive.
    ///
    /// Cancel safe: a waiter dropped before it acquires the mutex still gives up its slot.
    pub async fn lock(&self, key: &str) -> ResourceGuard {
        let mutex = {
            let mut shard = self.shard(key);
            let slot = shard.entry(key.to_string()).or_insert_with(|| Slot {
                mutex: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            Arc::clone(&slot.mutex)
        };

        // Registered before waiting; its drop releases the slot either way.
        let mut resource = ResourceGuard {
            key: key.to_string(),
            guard: None,
            locks: self.clone(),
        };
        resource.guard = Some(mutex.lock_owned().await);
        resource
    }

    /// Number of identifiers currently locked or waited on.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(|p| p.into_inner()).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &str) {
        let mut shard = self.shard(key);
        let Some(slot) = shard.get_mut(key) else {
            return;
        };
        slot.users = slot.users.saturating_sub(1);
        if slot.users == 0 {
            shard.remove(key);
        }
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive write access to one identifier.
///
/// `guard` is only `None` while the owning `lock` call is still waiting.
pub struct ResourceGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: KeyedLocks,
}

impl ResourceGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGuard").field("key", &self.key).finish()
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_second_lock_waits_for_first() {
        let locks = KeyedLocks::new();
        let first = locks.lock("a").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("a").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedLocks::with_shards(1);
        let _a = locks.lock("a").await;
        tokio::time::timeout(Duration::from_millis(100), locks.lock("b"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_entries_are_removed_after_release() {
        let locks = KeyedLocks::new();
        {
            let guard = locks.lock("a").await;
            assert_eq!(guard.key(), "a");
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_entry() {
        let locks = KeyedLocks::new();
        let holder = locks.lock("a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("a").await;
                std::future::pending::<()>().await;
            })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(locks.len(), 1);

        drop(holder);
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        assert!(locks.is_empty());
        tokio::time::timeout(Duration::from_millis(100), locks.lock("a"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_waiter_cancelled_while_lock_is_held() {
        let locks = KeyedLocks::new();
        let holder = locks.lock("a").await;

        let waiter = tokio::time::timeout(Duration::from_millis(20), locks.lock("a")).await;
        assert!(waiter.is_err());
        assert_eq!(locks.len(), 1);

        drop(holder);
        assert!(locks.is_empty());
    }
}
