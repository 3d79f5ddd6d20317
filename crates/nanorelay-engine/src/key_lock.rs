//! Key-Lock Table (§4.1): a coarse per-key mutual-exclusion device. No
//! fairness guarantee beyond what the condition variable provides.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};

struct Inner {
    held: Mutex<HashSet<String>>,
    cvar: Condvar,
}

#[derive(Clone)]
pub struct KeyLockTable {
    inner: Arc<Inner>,
}

impl KeyLockTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                held: Mutex::new(HashSet::new()),
                cvar: Condvar::new(),
            }),
        }
    }

    /// Block until `key` is free, then hold it.
    pub fn lock(&self, key: &str) -> KeyLockGuard {
        let mut held = self.inner.held.lock().unwrap();
        while held.contains(key) {
            held = self.inner.cvar.wait(held).unwrap();
        }
        held.insert(key.to_string());
        drop(held);
        KeyLockGuard {
            table: self.clone(),
            key: key.to_string(),
        }
    }

    /// Non-blocking: take `key` only if it is currently free.
    pub fn try_lock(&self, key: &str) -> Option<KeyLockGuard> {
        let mut held = self.inner.held.lock().unwrap();
        if held.contains(key) {
            return None;
        }
        held.insert(key.to_string());
        drop(held);
        Some(KeyLockGuard {
            table: self.clone(),
            key: key.to_string(),
        })
    }

    /// `lock`, off the async executor thread so a long wait never blocks it.
    pub async fn lock_async(&self, key: &str) -> KeyLockGuard {
        let this = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || this.lock(&key))
            .await
            .expect("key-lock acquisition task panicked")
    }

    fn unlock(&self, key: &str) {
        let mut held = self.inner.held.lock().unwrap();
        if !held.remove(key) {
            panic!("unlock called for key not held: {key}");
        }
        drop(held);
        self.inner.cvar.notify_all();
    }
}

impl Default for KeyLockTable {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII handle for a held key. Dropping it — including on panic or
/// cancellation — always unlocks.
pub struct KeyLockGuard {
    table: KeyLockTable,
    key: String,
}

impl Drop for KeyLockGuard {
    fn drop(&mut self) {
        self.table.unlock(&self.key);
    }
}
