use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;
type Acquire = Pin<Box<dyn Future<Output = OwnedMutexGuard<()>> + Send>>;

/// Async mutual exclusion keyed by string.
///
/// Entries are created on first use and removed once the last holder or
/// waiter is gone, so the table only holds keys currently in contention.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    table: Arc<LockTable>,
}

/// Exclusive hold on one key. Released on drop.
pub struct KeyGuard {
    key: String,
    table: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

/// A `lock` call still waiting for its key. Dropping it mid-wait cleans up
/// the table entry like a released guard does.
struct Waiter {
    key: String,
    table: Arc<LockTable>,
    acquire: Option<Acquire>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and take it.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = {
            let mut table = self.table.lock().expect("lock poisoned");
            table.entry(key.to_string()).or_default().clone()
        };
        let mut waiter = Waiter {
            key: key.to_string(),
            table: self.table.clone(),
            acquire: None,
        };
        let acquire: Acquire = Box::pin(mutex.lock_owned());
        let guard = waiter.acquire.insert(acquire).await;
        KeyGuard {
            key: key.to_string(),
            table: self.table.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.table.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        release_entry(&self.table, &self.key);
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.acquire.take();
        release_entry(&self.table, &self.key);
    }
}

/// Remove `key` once the table holds the only reference to its mutex.
fn release_entry(table: &LockTable, key: &str) {
    let mut table = match table.lock() {
        Ok(table) => table,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(entry) = table.get(key) {
        if Arc::strong_count(entry) == 1 {
            table.remove(key);
        }
    }
}

impl std::fmt::Debug for KeyedLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedLocks").field("held", &self.len()).finish()
    }
}

impl std::fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.key).finish()
    }
}
