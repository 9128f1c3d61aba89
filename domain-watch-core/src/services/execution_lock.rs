//! Per-domain execution lock: at most one in-flight check per domain.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::DomainId;

/// Guard held for the whole probe → reconcile → persist sequence
pub type CheckGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct ExecutionLocks {
    locks: Mutex<HashMap<DomainId, Arc<AsyncMutex<()>>>>,
}

impl ExecutionLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: DomainId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }

    /// Acquire the domain's lock, waiting at most `wait`.
    ///
    /// Returns `None` when another check still holds it. Released on drop.
    pub async fn try_acquire(&self, id: DomainId, wait: Duration) -> Option<CheckGuard> {
        let slot = self.slot(id);
        if let Ok(guard) = Arc::clone(&slot).try_lock_owned() {
            return Some(guard);
        }
        tokio::time::timeout(wait, slot.lock_owned()).await.ok()
    }

    /// Whether a check currently holds the domain's lock
    #[must_use]
    pub fn is_held(&self, id: DomainId) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.get(&id).is_some_and(|slot| slot.try_lock().is_err())
    }

    /// Drop the lock slot of a deleted domain.
    ///
    /// A check still holding the old slot keeps it until it finishes.
    pub fn forget(&self, id: DomainId) {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}
