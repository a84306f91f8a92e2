use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type LockTable = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Per-document mutual exclusion for read-modify-write workflows.
///
/// Keys identify one remote document (see `ConnectionConfig::document_key`).
/// A second publish or retrieve against the same key waits until the first
/// guard is dropped. A key's entry is pruned when its last guard is released
/// with nobody waiting, so the table only holds documents in use.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: LockTable,
}

/// Held for the whole workflow; released on drop, on every exit path.
#[derive(Debug)]
pub struct DocumentGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockTable,
}

impl DocumentGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for DocumentGuard {
    fn drop(&mut self) {
        // unlock first so an idle slot is only referenced by the table
        drop(self.guard.take());
        let idle = |_: &String, slot: &Arc<Mutex<()>>| Arc::strong_count(slot) == 1;
        self.locks.remove_if(&self.key, idle);
        debug!("Released document lock {}", self.key);
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn guard(&self, key: &str, guard: OwnedMutexGuard<()>) -> DocumentGuard {
        DocumentGuard {
            key: key.to_string(),
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> DocumentGuard {
        let guard = self.slot(key).lock_owned().await;
        debug!("Acquired document lock {}", key);
        self.guard(key, guard)
    }

    /// Take the lock only if nobody holds it.
    pub fn try_acquire(&self, key: &str) -> Option<DocumentGuard> {
        let guard = self.slot(key).try_lock_owned().ok()?;
        Some(self.guard(key, guard))
    }

    /// Number of documents currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = LockManager::new();
        let guard = locks.acquire("o/r@main:db.json").await;
        assert_eq!(guard.key(), "o/r@main:db.json");
        assert!(locks.try_acquire("o/r@main:db.json").is_none());

        drop(guard);
        assert!(locks.try_acquire("o/r@main:db.json").is_some());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = LockManager::new();
        let _a = locks.acquire("o/r@main:a.json").await;
        assert!(locks.try_acquire("o/r@main:b.json").is_some());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let locks = Arc::new(LockManager::new());
        let guard = locks.acquire("doc").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("doc").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_released_keys_are_pruned() {
        let locks = LockManager::new();
        for n in 0..50 {
            let _guard = locks.acquire(&format!("o/r@main:{}.json", n)).await;
        }
        assert!(locks.is_empty());

        let held = locks.acquire("o/r@main:db.json").await;
        assert!(locks.try_acquire("o/r@main:db.json").is_none());
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_release_while_someone_waits() {
        let locks = Arc::new(LockManager::new());
        let guard = locks.acquire("doc").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("doc").await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(locks.len(), 1);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(locks.is_empty());
    }
}
