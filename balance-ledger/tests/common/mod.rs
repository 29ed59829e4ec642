//! Common test utilities for balance-ledger integration tests.

#![allow(dead_code)]

use balance_ledger::config::{ConservationPolicy, LedgerConfig};
use balance_ledger::models::Address;
use balance_ledger::services::{Ledger, MemoryAccountStore, MemoryEventSink};
use balance_ledger::startup::AppState;
use rust_decimal::Decimal;
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,balance_ledger=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Ledger over in-memory collaborators, with handles to inspect them.
pub struct TestLedger {
    pub ledger: Arc<Ledger>,
    pub store: Arc<MemoryAccountStore>,
    pub sink: Arc<MemoryEventSink>,
}

impl TestLedger {
    /// Current state of an address straight from the store.
    pub fn address(&self, address_id: &str) -> Address {
        self.store
            .snapshot()
            .into_iter()
            .find(|a| a.address_id == address_id)
            .unwrap_or_else(|| panic!("address {} not provisioned", address_id))
    }

    /// Sum of available and locked balances across every address.
    pub fn total_value(&self) -> Decimal {
        self.store.snapshot().iter().map(|a| a.total_balance()).sum()
    }
}

/// Spawn a ledger with the given addresses as `(id, available, locked)`.
pub fn spawn_ledger(addresses: &[(&str, Decimal, Decimal)]) -> TestLedger {
    spawn_ledger_with_policy(addresses, ConservationPolicy::Asymmetric)
}

pub fn spawn_ledger_with_policy(
    addresses: &[(&str, Decimal, Decimal)],
    policy: ConservationPolicy,
) -> TestLedger {
    init_tracing();

    let store = Arc::new(MemoryAccountStore::new());
    for (address_id, available, locked) in addresses {
        store.provision(Address::new(*address_id, *available, *locked));
    }
    let sink = Arc::new(MemoryEventSink::new());

    let ledger = Ledger::new(store.clone(), sink.clone()).with_policy(policy);

    TestLedger {
        ledger: Arc::new(ledger),
        store,
        sink,
    }
}

/// Test configuration: in-memory store, ephemeral port.
pub fn test_config(policy: ConservationPolicy) -> LedgerConfig {
    LedgerConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "balance-ledger-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: None,
        conservation: policy,
        seed_file: None,
    }
}

/// Application state over a test ledger, for driving the router directly.
pub fn app_state(test: &TestLedger) -> AppState {
    AppState {
        config: test_config(test.ledger.policy()),
        ledger: test.ledger.clone(),
    }
}
