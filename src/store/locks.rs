use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Per-key async locks serializing read-modify-write cycles inside one process.
///
/// Entries live only while a guard is held or awaited, so the table stays as
/// small as the set of keys currently in use. Other processes sharing the
/// same store are not covered; there the last writer wins.
#[derive(Debug, Clone, Default)]
pub struct KeyLocks {
    locks: Arc<LockTable>,
}

/// Held lock on one key. Dropping it releases the key and evicts the table
/// entry when nobody else is waiting on it.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    locks: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Release first so the table's Arc is the only one left if uncontended
        drop(self.guard.take());
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        KeyGuard {
            key: key.to_string(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Keys currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
