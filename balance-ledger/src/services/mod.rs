//! Services module for balance-ledger.

pub mod database;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod metrics;
pub mod provision;
pub mod sink;
pub mod store;

pub use database::Database;
pub use error::{LedgerError, PairUpdateError, SinkError, StoreError};
pub use ledger::Ledger;
pub use metrics::{get_metrics, init_metrics};
pub use sink::{EventSink, MemoryEventSink, TracingEventSink};
pub use store::{AccountStore, MemoryAccountStore};
