use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;

/// Failure reported by an [`AccountStore`](crate::services::AccountStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Address not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Which write of a two-address update failed.
#[derive(Error, Debug)]
pub enum PairUpdateError {
    /// Nothing was persisted.
    #[error("First update failed: {0}")]
    First(StoreError),

    /// The first address was persisted, the second was not.
    #[error("Second update failed: {0}")]
    Second(StoreError),
}

/// Failure reported by an [`EventSink`](crate::services::EventSink).
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Event rejected: {0}")]
    Rejected(String),

    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(anyhow::Error),
}

/// Typed failure of a ledger transition.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount {
        amount: Decimal,
        reason: &'static str,
    },

    #[error("Insufficient funds in {address_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        address_id: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Crediting `amount` would push a balance of `address_id` past the
    /// largest storable value.
    #[error("Balance overflow in {address_id}: {balance} + {amount} exceeds the maximum balance")]
    BalanceOverflow {
        address_id: String,
        balance: Decimal,
        amount: Decimal,
    },

    #[error("Address not found: {0}")]
    NotFound(String),

    #[error("Cannot transfer from {0} to itself")]
    SelfTransfer(String),

    #[error("Transfer must conserve value: send {send_amount} != receive {receive_amount}")]
    ConservationViolation {
        send_amount: Decimal,
        receive_amount: Decimal,
    },

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Source was debited and persisted, destination credit was not.
    /// Operators must reconcile the two addresses.
    #[error("Partial transfer from {from} to {to}: destination update failed: {source}")]
    PartialTransfer {
        from: String,
        to: String,
        source: StoreError,
    },
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(address_id) => LedgerError::NotFound(address_id),
            other => LedgerError::Store(other),
        }
    }
}

impl LedgerError {
    /// Short label for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount { .. } => "invalid_amount",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::BalanceOverflow { .. } => "balance_overflow",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::SelfTransfer(_) => "self_transfer",
            LedgerError::ConservationViolation { .. } => "conservation_violation",
            LedgerError::Store(_) => "store_error",
            LedgerError::Sink(_) => "sink_error",
            LedgerError::PartialTransfer { .. } => "partial_transfer",
        }
    }

    /// Whether the caller's request was rejected, as opposed to an
    /// infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAmount { .. }
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::BalanceOverflow { .. }
                | LedgerError::NotFound(_)
                | LedgerError::SelfTransfer(_)
                | LedgerError::ConservationViolation { .. }
        )
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::InvalidAmount { .. }
            | LedgerError::SelfTransfer(_)
            | LedgerError::ConservationViolation { .. } => {
                AppError::BadRequest(anyhow::anyhow!(message))
            }
            LedgerError::InsufficientFunds { .. } | LedgerError::BalanceOverflow { .. } => {
                AppError::Conflict(anyhow::anyhow!(message))
            }
            LedgerError::NotFound(_) => AppError::NotFound(anyhow::anyhow!(message)),
            LedgerError::Store(StoreError::Unavailable(_)) => AppError::ServiceUnavailable,
            LedgerError::Store(_) | LedgerError::PartialTransfer { .. } => {
                AppError::DatabaseError(anyhow::anyhow!(message))
            }
            LedgerError::Sink(_) => AppError::InternalError(anyhow::anyhow!(message)),
        }
    }
}
