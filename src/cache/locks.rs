//! Per-subject async locks.
//!
//! Serialises reference computation for one subject while leaving other
//! subjects free to proceed. Map entries are dropped once nobody holds or
//! waits on them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    /// Holders plus waiters.
    refs: usize,
}

type LockMap = Arc<Mutex<HashMap<String, Slot>>>;

#[derive(Clone, Default)]
pub struct SubjectLocks {
    inner: LockMap,
}

impl SubjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `subject_id`.
    ///
    /// Dropping the returned future while it waits still releases the map
    /// entry.
    pub async fn acquire(&self, subject_id: &str) -> SubjectLockGuard {
        let slot = SlotRef::register(&self.inner, subject_id);
        let guard = slot.mutex.clone().lock_owned().await;

        SubjectLockGuard {
            _guard: guard,
            slot,
        }
    }

    /// Number of subjects currently locked or waited on.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SubjectLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubjectLocks")
            .field("active", &self.len())
            .finish()
    }
}

/// A counted reference to one map entry; the last one out removes it.
struct SlotRef {
    key: String,
    mutex: Arc<AsyncMutex<()>>,
    locks: LockMap,
}

impl SlotRef {
    fn register(locks: &LockMap, subject_id: &str) -> Self {
        let mutex = {
            let mut map = locks.lock();
            let slot = map.entry(subject_id.to_string()).or_default();
            slot.refs += 1;
            slot.mutex.clone()
        };
        Self {
            key: subject_id.to_string(),
            mutex,
            locks: locks.clone(),
        }
    }
}

impl Drop for SlotRef {
    fn drop(&mut self) {
        let mut map = self.locks.lock();
        if let Some(slot) = map.get_mut(&self.key)
            && Arc::ptr_eq(&slot.mutex, &self.mutex)
        {
            slot.refs -= 1;
            if slot.refs == 0 {
                map.remove(&self.key);
            }
        }
    }
}

/// Held for as long as the caller owns the subject.
pub struct SubjectLockGuard {
    // Field order matters: the mutex guard is released before the slot prunes.
    _guard: OwnedMutexGuard<()>,
    slot: SlotRef,
}

impl SubjectLockGuard {
    pub fn subject_id(&self) -> &str {
        &self.slot.key
    }
}

impl std::fmt::Debug for SubjectLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubjectLockGuard")
            .field("subject_id", &self.slot.key)
            .finish()
    }
}
