//! Operator seeding of addresses, outside the ledger core.
//!
//! `SEED_ADDRESSES_FILE` points at a JSON array of
//! `{"address_id": "...", "available_balance": "...", "lock_balance": "..."}`
//! entries, applied once at startup. The in-memory store starts empty, so
//! without a seed file every transition against it fails with not found.

use crate::models::{Address, ProvisionAddress};
use crate::services::ledger::{max_balance, AMOUNT_SCALE};
use crate::services::{Database, MemoryAccountStore};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument};

/// Read and validate a seed file.
pub fn load_seed_file(path: &Path) -> Result<Vec<ProvisionAddress>, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "Failed to read seed file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_seed(&raw)
}

/// Parse and validate seed entries from JSON.
pub fn parse_seed(raw: &str) -> Result<Vec<ProvisionAddress>, AppError> {
    let entries: Vec<ProvisionAddress> = serde_json::from_str(raw)
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid seed file: {}", e)))?;

    let mut seen = HashSet::new();
    for entry in &entries {
        if entry.address_id.is_empty() || entry.address_id.len() > 255 {
            return Err(seed_error(&entry.address_id, "address id must be 1-255 characters"));
        }
        if !seen.insert(entry.address_id.as_str()) {
            return Err(seed_error(&entry.address_id, "duplicate address id"));
        }
        for balance in [entry.available_balance, entry.lock_balance] {
            if !balance_in_range(balance) {
                return Err(seed_error(&entry.address_id, "balance out of range"));
            }
        }
    }

    Ok(entries)
}

fn balance_in_range(balance: Decimal) -> bool {
    balance >= Decimal::ZERO
        && balance <= max_balance()
        && balance.normalize().scale() <= AMOUNT_SCALE
}

fn seed_error(address_id: &str, reason: &str) -> AppError {
    AppError::ConfigError(anyhow::anyhow!(
        "Invalid seed entry '{}': {}",
        address_id,
        reason
    ))
}

/// Seed the in-memory store, replacing any existing state of the same ids.
pub fn seed_memory(store: &MemoryAccountStore, entries: Vec<ProvisionAddress>) {
    let count = entries.len();
    for entry in entries {
        store.provision(Address::from(entry));
    }
    info!(count = count, "Seeded in-memory store");
}

/// Seed Postgres. Addresses that already exist keep their balances.
#[instrument(skip(db, entries), fields(count = entries.len()))]
pub async fn seed_database(db: &Database, entries: Vec<ProvisionAddress>) -> Result<(), AppError> {
    let mut created = 0usize;
    for entry in entries {
        match db.provision(&Address::from(entry)).await {
            Ok(_) => created += 1,
            Err(AppError::Conflict(e)) => info!(reason = %e, "Skipping seed entry"),
            Err(e) => return Err(e),
        }
    }
    info!(created = created, "Seeded database");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_entries_with_default_balances() {
        let entries = parse_seed(
            r#"[
                {"address_id": "alice", "available_balance": "100", "lock_balance": "5.5"},
                {"address_id": "bob"}
            ]"#,
        )
        .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].available_balance, dec!(100));
        assert_eq!(entries[0].lock_balance, dec!(5.5));
        assert_eq!(entries[1].available_balance, Decimal::ZERO);
    }

    #[test]
    fn rejects_invalid_entries() {
        for raw in [
            r#"[{"address_id": ""}]"#,
            r#"[{"address_id": "a"}, {"address_id": "a"}]"#,
            r#"[{"address_id": "a", "available_balance": "-1"}]"#,
            r#"[{"address_id": "a", "lock_balance": "0.000000001"}]"#,
            r#"{"address_id": "a"}"#,
        ] {
            assert!(
                matches!(parse_seed(raw), Err(AppError::ConfigError(_))),
                "accepted {}",
                raw
            );
        }
    }

    #[test]
    fn seeds_memory_store() {
        let store = MemoryAccountStore::new();
        let entries = parse_seed(r#"[{"address_id": "alice", "available_balance": "7"}]"#).unwrap();

        seed_memory(&store, entries);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].available_balance, dec!(7));
    }
}
