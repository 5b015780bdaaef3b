//! Per-session turn serialisation.
//!
//! A browser can fire several requests against the same session at once.
//! Each of them loads the [`ChatSession`](super::ChatSession), mutates it and
//! writes it back, so two unserialised turns would each commit their own
//! copy and one exchange would be lost. Handlers hold a [`SessionGuard`]
//! from before the load until after the save.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of one async mutex per live session key.
#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder has `key`, then take it.
    pub async fn acquire(&self, key: &str) -> SessionGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(key.to_string()).or_default().clone()
        };

        let guard = lock.lock_owned().await;

        SessionGuard {
            guard: Some(guard),
            key: key.to_string(),
            locks: self.locks.clone(),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn active(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Exclusive access to one session. Released on drop.
pub struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard").field("key", &self.key).finish()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        self.guard.take();

        // Only the registry still points at the mutex: nobody holds or waits
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}
