//! Named locks keyed by resource ID
//!
//! Resources that mutate a shared parent (for example the access policy list
//! of an HPC cache) take a lock on the parent's ID for the whole
//! read-modify-write-then-poll sequence. The returned [`LockGuard`] releases
//! the lock when dropped, so every exit path unlocks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;

/// LockManager hands out exclusive locks by name
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Wait for and take the lock named `id`
    async fn lock(&self, id: &str) -> LockGuard;
}

/// Held lock, released on drop
pub struct LockGuard {
    id: String,
    _release: Box<dyn Send + Sync>,
}

impl LockGuard {
    pub fn new(id: impl Into<String>, release: Box<dyn Send + Sync>) -> Self {
        Self {
            id: id.into(),
            _release: release,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        tracing::debug!(id = %self.id, "releasing lock");
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("id", &self.id).finish()
    }
}

type LockMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

fn lock_map(locks: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    match locks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Process-local lock manager. An ID's entry lives only while someone holds
/// or waits for it.
#[derive(Default)]
pub struct InMemoryLockManager {
    locks: Arc<Mutex<LockMap>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        lock_map(&self.locks)
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Number of IDs currently held or waited on
    pub fn tracked(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

/// Unlocks, then drops the map entry once no other task references it
struct Release {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
    id: String,
}

impl Drop for Release {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = lock_map(&self.locks);
        if locks
            .get(&self.id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn lock(&self, id: &str) -> LockGuard {
        let mutex = self.entry(id);
        tracing::debug!(id = %id, "waiting for lock");
        let guard: OwnedMutexGuard<()> = mutex.lock_owned().await;
        tracing::info!(id = %id, "acquired lock");
        let release = Release {
            guard: Some(guard),
            locks: self.locks.clone(),
            id: id.to_string(),
        };
        LockGuard::new(id, Box::new(release))
    }
}
