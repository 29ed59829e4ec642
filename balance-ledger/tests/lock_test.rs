//! Lock and unlock integration tests.

mod common;

use balance_ledger::models::LedgerEvent;
use balance_ledger::services::LedgerError;
use common::spawn_ledger;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn lock_moves_available_into_locked() {
    let test = spawn_ledger(&[("alice", dec!(100), dec!(0))]);

    let envelope = test.ledger.lock("alice", dec!(40)).await.unwrap();

    let alice = test.address("alice");
    assert_eq!(alice.available_balance, dec!(60));
    assert_eq!(alice.lock_balance, dec!(40));
    assert_eq!(test.sink.len(), 1);
    match envelope.event {
        LedgerEvent::Lock {
            address,
            lock_amount,
        } => {
            assert_eq!(lock_amount, dec!(40));
            assert_eq!(address, alice);
        }
        other => panic!("expected lock event, got {:?}", other),
    }
}

#[tokio::test]
async fn lock_beyond_available_is_rejected() {
    let test = spawn_ledger(&[("alice", dec!(30), dec!(10))]);

    let err = test.ledger.lock("alice", dec!(31)).await.unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    let alice = test.address("alice");
    assert_eq!(alice.available_balance, dec!(30));
    assert_eq!(alice.lock_balance, dec!(10));
    assert!(test.sink.is_empty());
}

#[tokio::test]
async fn unlock_within_locked_balance() {
    let test = spawn_ledger(&[("alice", dec!(10), dec!(30))]);

    let envelope = test.ledger.unlock("alice", dec!(20)).await.unwrap();

    let alice = test.address("alice");
    assert_eq!(alice.available_balance, dec!(30));
    assert_eq!(alice.lock_balance, dec!(10));
    assert!(matches!(
        envelope.event,
        LedgerEvent::Unlock { unlock_amount, .. } if unlock_amount == dec!(20)
    ));
}

#[tokio::test]
async fn unlock_clamps_to_locked_balance() {
    let test = spawn_ledger(&[("alice", dec!(10), dec!(30))]);

    let envelope = test.ledger.unlock("alice", dec!(50)).await.unwrap();

    let alice = test.address("alice");
    assert_eq!(alice.available_balance, dec!(40));
    assert_eq!(alice.lock_balance, dec!(0));
    match envelope.event {
        LedgerEvent::Unlock {
            address,
            unlock_amount,
        } => {
            assert_eq!(unlock_amount, dec!(30), "event reports the clamped amount");
            assert_eq!(address, alice);
        }
        other => panic!("expected unlock event, got {:?}", other),
    }
}

#[tokio::test]
async fn unlock_with_nothing_locked_emits_zero_unlock() {
    let test = spawn_ledger(&[("alice", dec!(10), dec!(0))]);

    let envelope = test.ledger.unlock("alice", dec!(5)).await.unwrap();

    assert_eq!(test.address("alice").available_balance, dec!(10));
    assert!(matches!(
        envelope.event,
        LedgerEvent::Unlock { unlock_amount, .. } if unlock_amount == dec!(0)
    ));
    assert_eq!(test.sink.len(), 1);
}

#[tokio::test]
async fn unlock_rejects_non_positive_amount() {
    let test = spawn_ledger(&[("alice", dec!(10), dec!(10))]);

    let err = test.ledger.unlock("alice", dec!(-1)).await.unwrap_err();

    assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    assert_eq!(test.address("alice").lock_balance, dec!(10));
}

#[tokio::test]
async fn lock_then_unlock_round_trip_preserves_total() {
    let test = spawn_ledger(&[("alice", dec!(100), dec!(0))]);

    test.ledger.lock("alice", dec!(70)).await.unwrap();
    assert!(test.ledger.withdraw("alice", dec!(40)).await.is_err());
    test.ledger.unlock("alice", dec!(70)).await.unwrap();
    test.ledger.withdraw("alice", dec!(40)).await.unwrap();

    let alice = test.address("alice");
    assert_eq!(alice.available_balance, dec!(60));
    assert_eq!(alice.lock_balance, dec!(0));
}

#[tokio::test]
async fn unlock_that_would_overflow_available_is_rejected() {
    let test = spawn_ledger(&[("alice", Decimal::MAX, Decimal::MAX)]);

    let err = test.ledger.unlock("alice", dec!(1)).await.unwrap_err();

    assert!(matches!(err, LedgerError::BalanceOverflow { .. }));
    let alice = test.address("alice");
    assert_eq!(alice.available_balance, Decimal::MAX);
    assert_eq!(alice.lock_balance, Decimal::MAX);
    assert!(test.sink.is_empty());
}

#[tokio::test]
async fn lock_that_would_overflow_locked_is_rejected() {
    let test = spawn_ledger(&[("alice", dec!(10), Decimal::MAX)]);

    let err = test.ledger.lock("alice", dec!(5)).await.unwrap_err();

    assert!(matches!(err, LedgerError::BalanceOverflow { .. }));
    let alice = test.address("alice");
    assert_eq!(alice.available_balance, dec!(10));
    assert_eq!(alice.lock_balance, Decimal::MAX);
    assert!(test.sink.is_empty());
}
