//! Domain models for balance-ledger.

mod address;
mod event;
mod transition;

pub use address::{Address, ProvisionAddress};
pub use event::{EventEnvelope, EventKind, LedgerEvent};
pub use transition::Transition;
