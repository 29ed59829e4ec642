//! Per-address mutual exclusion for read-modify-write transitions.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed lock table. Entries are created on demand and dropped again once
/// no transition holds or waits on them.
#[derive(Default)]
pub struct AddressLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AddressLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock one address until the returned guard is dropped.
    pub async fn acquire(&self, address_id: &str) -> AddressGuard<'_> {
        self.acquire_all(vec![address_id.to_string()]).await
    }

    /// Lock two addresses. Locks are always taken in lexicographic order so
    /// two opposite transfers cannot deadlock.
    pub async fn acquire_pair(&self, first: &str, second: &str) -> AddressGuard<'_> {
        self.acquire_all(vec![first.to_string(), second.to_string()])
            .await
    }

    /// Number of addresses currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }

    async fn acquire_all(&self, mut keys: Vec<String>) -> AddressGuard<'_> {
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let mutex = Arc::clone(&self.locks.entry(key.clone()).or_default());
            guards.push(mutex.lock_owned().await);
        }

        AddressGuard {
            locks: self,
            keys,
            guards,
        }
    }
}

/// Held locks on one or more addresses.
pub struct AddressGuard<'a> {
    locks: &'a AddressLocks,
    keys: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for AddressGuard<'_> {
    fn drop(&mut self) {
        // Release in reverse acquisition order, then forget idle entries.
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
        for key in &self.keys {
            self.locks
                .locks
                .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}
