//! Address model: one named account with available and locked balances.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Ledger address.
///
/// Both balances are non-negative before and after every transition. The
/// address id is assigned when the address is provisioned and never changes.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub address_id: String,
    pub available_balance: Decimal,
    pub lock_balance: Decimal,
    pub updated_utc: DateTime<Utc>,
}

impl Address {
    /// New address with the given opening balances.
    pub fn new(
        address_id: impl Into<String>,
        available_balance: Decimal,
        lock_balance: Decimal,
    ) -> Self {
        Self {
            address_id: address_id.into(),
            available_balance,
            lock_balance,
            updated_utc: Utc::now(),
        }
    }

    /// Sum of available and locked funds.
    pub fn total_balance(&self) -> Decimal {
        self.available_balance + self.lock_balance
    }

    /// Whether both balances satisfy the non-negativity invariant.
    pub fn is_solvent(&self) -> bool {
        self.available_balance >= Decimal::ZERO && self.lock_balance >= Decimal::ZERO
    }

    pub(crate) fn touch(&mut self) {
        self.updated_utc = Utc::now();
    }
}

/// Input for provisioning an address outside the ledger core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionAddress {
    pub address_id: String,
    #[serde(default)]
    pub available_balance: Decimal,
    #[serde(default)]
    pub lock_balance: Decimal,
}

impl From<ProvisionAddress> for Address {
    fn from(input: ProvisionAddress) -> Self {
        Address::new(input.address_id, input.available_balance, input.lock_balance)
    }
}
