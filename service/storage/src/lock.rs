use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key mutual exclusion.
///
/// Requests and file references of one `(checksum, storage)` are only mutated
/// under that key's lock, group publication under the group's. A group lock
/// may be taken while holding a file lock, never the other way around.
#[derive(Default)]
pub struct KeyedLock {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

pub(crate) fn file_key(checksum: &str, storage: &str) -> String {
    format!("file_{checksum}_{storage}")
}

pub(crate) fn group_key(group_id: &str) -> String {
    format!("group_{group_id}")
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: String) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(key).or_default().clone();
        mutex.lock_owned().await
    }

    /// Forget the keys nobody holds or waits for.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
