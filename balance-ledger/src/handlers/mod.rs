//! HTTP handlers for balance-ledger.

pub mod health;
pub mod transitions;

pub use health::{health_check, metrics_handler, readiness_check};
pub use transitions::{
    apply_transition, deposit, get_address, lock, transfer, unlock, withdraw,
};
