//! Audit events emitted once per successful transition.

use crate::models::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of transition an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Deposit,
    Withdraw,
    Transfer,
    Lock,
    Unlock,
}

impl EventKind {
    /// Get string representation for database and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Transfer => "transfer",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One completed transition, carrying post-transition snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LedgerEvent {
    Deposit {
        to_address: Address,
        deposit_amount: Decimal,
    },
    Withdraw {
        from_address: Address,
        withdraw_amount: Decimal,
    },
    Transfer {
        from: Address,
        to: Address,
        send_amount: Decimal,
        receive_amount: Decimal,
    },
    Lock {
        address: Address,
        lock_amount: Decimal,
    },
    /// `unlock_amount` is the effective amount after clamping.
    Unlock {
        address: Address,
        unlock_amount: Decimal,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Deposit { .. } => EventKind::Deposit,
            Self::Withdraw { .. } => EventKind::Withdraw,
            Self::Transfer { .. } => EventKind::Transfer,
            Self::Lock { .. } => EventKind::Lock,
            Self::Unlock { .. } => EventKind::Unlock,
        }
    }

    /// Post-transition snapshots of every address the event touched.
    pub fn addresses(&self) -> Vec<&Address> {
        match self {
            Self::Deposit { to_address, .. } => vec![to_address],
            Self::Withdraw { from_address, .. } => vec![from_address],
            Self::Transfer { from, to, .. } => vec![from, to],
            Self::Lock { address, .. } | Self::Unlock { address, .. } => vec![address],
        }
    }
}

/// Event as handed to the sink: the payload plus an id and emission time so
/// auditors can order and reference events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub emitted_utc: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

impl EventEnvelope {
    pub fn new(event: LedgerEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            emitted_utc: Utc::now(),
            event,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}
