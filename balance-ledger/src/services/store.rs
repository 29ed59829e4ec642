//! Account store contract and the in-memory implementation.

use crate::models::Address;
use crate::services::error::{PairUpdateError, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Mutex;

/// Persistence for addresses. The ledger only reads and rewrites existing
/// addresses; provisioning happens outside the core.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch an address, or `StoreError::NotFound`.
    async fn get(&self, address_id: &str) -> Result<Address, StoreError>;

    /// Overwrite the balances of an existing address.
    async fn update(&self, address: &Address) -> Result<(), StoreError>;

    /// Persist two addresses, `first` then `second`.
    ///
    /// The default is two independent writes: if the second fails the first
    /// stays persisted and `PairUpdateError::Second` is returned. Stores that
    /// support transactions override this to make the pair atomic.
    async fn update_pair(&self, first: &Address, second: &Address) -> Result<(), PairUpdateError> {
        self.update(first).await.map_err(PairUpdateError::First)?;
        self.update(second).await.map_err(PairUpdateError::Second)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-process store backed by a concurrent map.
#[derive(Default)]
pub struct MemoryAccountStore {
    addresses: DashMap<String, Address>,
    failing_updates: Mutex<HashSet<String>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an address. Provisioning entry point for operators
    /// and tests.
    pub fn provision(&self, address: Address) {
        self.addresses.insert(address.address_id.clone(), address);
    }

    /// Make every subsequent `update` of `address_id` fail with
    /// `StoreError::Unavailable`.
    pub fn fail_updates_for(&self, address_id: &str) {
        if let Ok(mut failing) = self.failing_updates.lock() {
            failing.insert(address_id.to_string());
        }
    }

    /// Undo [`fail_updates_for`](Self::fail_updates_for).
    pub fn restore_updates_for(&self, address_id: &str) {
        if let Ok(mut failing) = self.failing_updates.lock() {
            failing.remove(address_id);
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Snapshot of every stored address.
    pub fn snapshot(&self) -> Vec<Address> {
        self.addresses.iter().map(|e| e.value().clone()).collect()
    }

    fn update_fails(&self, address_id: &str) -> Result<bool, StoreError> {
        self.failing_updates
            .lock()
            .map(|failing| failing.contains(address_id))
            .map_err(|e| StoreError::Database(anyhow::anyhow!("Store mutex poisoned: {}", e)))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, address_id: &str) -> Result<Address, StoreError> {
        self.addresses
            .get(address_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(address_id.to_string()))
    }

    async fn update(&self, address: &Address) -> Result<(), StoreError> {
        if self.update_fails(&address.address_id)? {
            return Err(StoreError::Unavailable(format!(
                "updates to {} are failing",
                address.address_id
            )));
        }

        match self.addresses.get_mut(&address.address_id) {
            Some(mut entry) => {
                *entry = address.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(address.address_id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn update_requires_existing_address() {
        let store = MemoryAccountStore::new();
        let err = store
            .update(&Address::new("ghost", dec!(1), dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn default_pair_update_reports_second_failure() {
        let store = MemoryAccountStore::new();
        store.provision(Address::new("a", dec!(10), dec!(0)));
        store.provision(Address::new("b", dec!(0), dec!(0)));
        store.fail_updates_for("b");

        let err = store
            .update_pair(
                &Address::new("a", dec!(5), dec!(0)),
                &Address::new("b", dec!(5), dec!(0)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PairUpdateError::Second(_)));
        assert_eq!(store.get("a").await.unwrap().available_balance, dec!(5));
        assert_eq!(store.get("b").await.unwrap().available_balance, dec!(0));
    }
}
