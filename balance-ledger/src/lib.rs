//! Balance Ledger - addresses with available and locked balances, moved by
//! five auditable transitions.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
