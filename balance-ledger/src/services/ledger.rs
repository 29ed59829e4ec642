//! Ledger core: the five balance transitions.
//!
//! Every transition runs as lock → read → validate → mutate → persist → emit
//! under the per-address lock(s) of the addresses it touches. A rejected
//! transition persists nothing and emits nothing.
//!
//! The ledger does not deduplicate: invoking the same transition twice
//! applies it twice. Callers must invoke each transition at most once.
//!
//! Amounts and balances are bounded by the `NUMERIC(28, 8)` columns of the
//! Postgres store: at most [`AMOUNT_SCALE`] fractional digits and at most
//! [`max_balance`]. A credit that would leave those bounds is rejected with
//! `LedgerError::BalanceOverflow` before anything is persisted.

use crate::config::ConservationPolicy;
use crate::models::{Address, EventEnvelope, EventKind, LedgerEvent, Transition};
use crate::services::error::{LedgerError, PairUpdateError};
use crate::services::locks::AddressLocks;
use crate::services::metrics::{
    record_error, record_transition, TRANSITION_DURATION, UNLOCK_CLAMPED_TOTAL,
};
use crate::services::{AccountStore, EventSink};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Fractional digits an amount or balance may carry.
pub const AMOUNT_SCALE: u32 = 8;

/// Largest balance an address may hold: 20 integer and 8 fractional digits.
pub fn max_balance() -> Decimal {
    Decimal::from_i128_with_scale(10_i128.pow(28) - 1, AMOUNT_SCALE)
}

/// Balance state machine over an injected store and sink.
pub struct Ledger {
    store: Arc<dyn AccountStore>,
    sink: Arc<dyn EventSink>,
    policy: ConservationPolicy,
    locks: AddressLocks,
}

impl Ledger {
    /// Create a ledger with the asymmetric transfer policy.
    pub fn new(store: Arc<dyn AccountStore>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            sink,
            policy: ConservationPolicy::default(),
            locks: AddressLocks::new(),
        }
    }

    pub fn with_policy(mut self, policy: ConservationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ConservationPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Read an address without modifying it.
    #[instrument(skip(self))]
    pub async fn address(&self, address_id: &str) -> Result<Address, LedgerError> {
        Ok(self.store.get(address_id).await?)
    }

    /// Route a transition request to its operation.
    pub async fn apply(&self, transition: Transition) -> Result<EventEnvelope, LedgerError> {
        match transition {
            Transition::Deposit { to, amount } => self.deposit(&to, amount).await,
            Transition::Withdraw { from, amount } => self.withdraw(&from, amount).await,
            Transition::Transfer {
                from,
                to,
                send_amount,
                receive_amount,
            } => {
                self.transfer(&from, &to, send_amount, receive_amount)
                    .await
            }
            Transition::Lock { address, amount } => self.lock(&address, amount).await,
            Transition::Unlock { address, amount } => self.unlock(&address, amount).await,
        }
    }

    /// Credit `amount` to the available balance of `to`.
    #[instrument(skip(self), fields(operation = "deposit"))]
    pub async fn deposit(&self, to: &str, amount: Decimal) -> Result<EventEnvelope, LedgerError> {
        self.observe(EventKind::Deposit, async {
            validate_amount(amount)?;
            let _guard = self.locks.acquire(to).await;

            let mut address = self.store.get(to).await?;
            address.available_balance = credit(&address, address.available_balance, amount)?;
            address.touch();

            self.store.update(&address).await?;
            self.emit(LedgerEvent::Deposit {
                to_address: address,
                deposit_amount: amount,
            })
            .await
        })
        .await
    }

    /// Debit `amount` from the available balance of `from`.
    #[instrument(skip(self), fields(operation = "withdraw"))]
    pub async fn withdraw(
        &self,
        from: &str,
        amount: Decimal,
    ) -> Result<EventEnvelope, LedgerError> {
        self.observe(EventKind::Withdraw, async {
            validate_amount(amount)?;
            let _guard = self.locks.acquire(from).await;

            let mut address = self.store.get(from).await?;
            ensure_available(&address, amount)?;
            address.available_balance -= amount;
            address.touch();

            self.store.update(&address).await?;
            self.emit(LedgerEvent::Withdraw {
                from_address: address,
                withdraw_amount: amount,
            })
            .await
        })
        .await
    }

    /// Debit `send_amount` from `from` and credit `receive_amount` to `to`.
    ///
    /// The source is persisted before the destination. Whether a failed
    /// destination write can leave the source debited depends on the store's
    /// `update_pair`; if it does, `LedgerError::PartialTransfer` is returned.
    #[instrument(skip(self), fields(operation = "transfer"))]
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        send_amount: Decimal,
        receive_amount: Decimal,
    ) -> Result<EventEnvelope, LedgerError> {
        self.observe(EventKind::Transfer, async {
            validate_amount(send_amount)?;
            validate_amount(receive_amount)?;
            if from == to {
                return Err(LedgerError::SelfTransfer(from.to_string()));
            }
            if self.policy == ConservationPolicy::Strict && send_amount != receive_amount {
                return Err(LedgerError::ConservationViolation {
                    send_amount,
                    receive_amount,
                });
            }

            let _guard = self.locks.acquire_pair(from, to).await;

            let mut source = self.store.get(from).await?;
            let mut destination = self.store.get(to).await?;
            ensure_available(&source, send_amount)?;

            destination.available_balance =
                credit(&destination, destination.available_balance, receive_amount)?;
            destination.touch();
            source.available_balance -= send_amount;
            source.touch();

            self.store
                .update_pair(&source, &destination)
                .await
                .map_err(|e| match e {
                    PairUpdateError::First(err) => LedgerError::from(err),
                    PairUpdateError::Second(err) => {
                        error!(
                            from = %from,
                            to = %to,
                            send_amount = %send_amount,
                            receive_amount = %receive_amount,
                            error = %err,
                            "Transfer debited source but failed to credit destination"
                        );
                        LedgerError::PartialTransfer {
                            from: from.to_string(),
                            to: to.to_string(),
                            source: err,
                        }
                    }
                })?;

            self.emit(LedgerEvent::Transfer {
                from: source,
                to: destination,
                send_amount,
                receive_amount,
            })
            .await
        })
        .await
    }

    /// Move `amount` from the available to the locked balance.
    #[instrument(skip(self), fields(operation = "lock"))]
    pub async fn lock(&self, address_id: &str, amount: Decimal) -> Result<EventEnvelope, LedgerError> {
        self.observe(EventKind::Lock, async {
            validate_amount(amount)?;
            let _guard = self.locks.acquire(address_id).await;

            let mut address = self.store.get(address_id).await?;
            ensure_available(&address, amount)?;
            address.lock_balance = credit(&address, address.lock_balance, amount)?;
            address.available_balance -= amount;
            address.touch();

            self.store.update(&address).await?;
            self.emit(LedgerEvent::Lock {
                address,
                lock_amount: amount,
            })
            .await
        })
        .await
    }

    /// Move up to `amount` from the locked to the available balance.
    ///
    /// Never fails for lack of funds: a request above the locked balance is
    /// clamped to it, and the event reports the clamped amount.
    #[instrument(skip(self), fields(operation = "unlock"))]
    pub async fn unlock(
        &self,
        address_id: &str,
        amount: Decimal,
    ) -> Result<EventEnvelope, LedgerError> {
        self.observe(EventKind::Unlock, async {
            validate_amount(amount)?;
            let _guard = self.locks.acquire(address_id).await;

            let mut address = self.store.get(address_id).await?;
            let effective = amount.min(address.lock_balance);
            if effective < amount {
                UNLOCK_CLAMPED_TOTAL.inc();
                debug!(
                    requested = %amount,
                    effective = %effective,
                    "Unlock clamped to locked balance"
                );
            }

            address.available_balance = credit(&address, address.available_balance, effective)?;
            address.lock_balance -= effective;
            address.touch();

            self.store.update(&address).await?;
            self.emit(LedgerEvent::Unlock {
                address,
                unlock_amount: effective,
            })
            .await
        })
        .await
    }

    async fn emit(&self, event: LedgerEvent) -> Result<EventEnvelope, LedgerError> {
        let envelope = EventEnvelope::new(event);
        let touched = envelope.event.addresses();
        debug_assert!(touched.iter().all(|a| a.is_solvent()));

        if let Err(e) = self.sink.emit(&envelope).await {
            // The store write already landed; the event is missing.
            let address_ids: Vec<&str> = touched.iter().map(|a| a.address_id.as_str()).collect();
            error!(
                event_id = %envelope.event_id,
                kind = %envelope.kind(),
                addresses = ?address_ids,
                error = %e,
                "Failed to emit event after persisting transition"
            );
            return Err(e.into());
        }
        Ok(envelope)
    }

    async fn observe<F>(&self, kind: EventKind, transition: F) -> Result<EventEnvelope, LedgerError>
    where
        F: Future<Output = Result<EventEnvelope, LedgerError>>,
    {
        let operation = kind.as_str();
        let timer = TRANSITION_DURATION
            .with_label_values(&[operation])
            .start_timer();

        let result = transition.await;
        timer.observe_duration();

        match &result {
            Ok(envelope) => {
                record_transition(operation, "ok");
                info!(event_id = %envelope.event_id, "Transition applied");
            }
            Err(e) if e.is_rejection() => {
                record_transition(operation, "rejected");
                record_error(e.error_type());
                warn!(error = %e, "Transition rejected");
            }
            Err(e) => {
                record_transition(operation, "error");
                record_error(e.error_type());
                error!(error = %e, "Transition failed");
            }
        }

        result
    }
}

fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    let reason = if amount <= Decimal::ZERO {
        "must be positive"
    } else if amount.normalize().scale() > AMOUNT_SCALE {
        "too many decimal places"
    } else if amount > max_balance() {
        "exceeds the maximum balance"
    } else {
        return Ok(());
    };
    Err(LedgerError::InvalidAmount { amount, reason })
}

/// `balance + amount`, or `BalanceOverflow` if that leaves the balance range.
fn credit(address: &Address, balance: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    balance
        .checked_add(amount)
        .filter(|credited| *credited <= max_balance())
        .ok_or_else(|| LedgerError::BalanceOverflow {
            address_id: address.address_id.clone(),
            balance,
            amount,
        })
}

fn ensure_available(address: &Address, requested: Decimal) -> Result<(), LedgerError> {
    if address.available_balance < requested {
        return Err(LedgerError::InsufficientFunds {
            address_id: address.address_id.clone(),
            available: address.available_balance,
            requested,
        });
    }
    Ok(())
}
