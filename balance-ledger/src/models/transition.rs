//! Transition requests accepted by the ledger router.

use crate::models::EventKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Caller-supplied request for one transition. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transition {
    Deposit {
        to: String,
        amount: Decimal,
    },
    Withdraw {
        from: String,
        amount: Decimal,
    },
    Transfer {
        from: String,
        to: String,
        send_amount: Decimal,
        receive_amount: Decimal,
    },
    Lock {
        address: String,
        amount: Decimal,
    },
    Unlock {
        address: String,
        amount: Decimal,
    },
}

impl Transition {
    /// Kind of event this transition emits on success.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Deposit { .. } => EventKind::Deposit,
            Self::Withdraw { .. } => EventKind::Withdraw,
            Self::Transfer { .. } => EventKind::Transfer,
            Self::Lock { .. } => EventKind::Lock,
            Self::Unlock { .. } => EventKind::Unlock,
        }
    }
}
