//! Integration tests for the double-submit guard.
//!
//! A submission is split into `begin_submit`, `place` and `finish_submit` so
//! the controller lock is released while the store works. These tests race a
//! second submit against one that is parked inside the store.

#![allow(clippy::unwrap_used)]

use shopdesk_checkout::memory::InMemoryOrderStore;
use shopdesk_checkout::{CheckoutError, CheckoutStep, Field};
use shopdesk_integration_tests::{GatedOrderStore, checkout_at_payment, flat_fee_builder, line};
use tokio::sync::Mutex;

// =============================================================================
// Concurrent Submits
// =============================================================================

#[tokio::test]
async fn test_second_submit_while_first_in_flight_is_rejected() {
    let checkout = Mutex::new(
        checkout_at_payment(flat_fee_builder(), vec![line(1, "99.99", 1).unwrap()]).unwrap(),
    );
    let store = GatedOrderStore::new();

    let first = async {
        let pending = checkout.lock().await.begin_submit().unwrap();
        let outcome = pending.place(&store).await;
        checkout.lock().await.finish_submit(outcome)
    };
    let second = async {
        store.wait_until_entered().await;
        {
            let mut guard = checkout.lock().await;
            assert!(guard.is_submitting());
            assert!(matches!(
                guard.begin_submit(),
                Err(CheckoutError::SubmissionInProgress)
            ));
            assert!(matches!(
                guard.submit(&store).await,
                Err(CheckoutError::SubmissionInProgress)
            ));
        }
        store.open();
    };

    let (confirmation, ()) = tokio::join!(first, second);

    let confirmation = confirmation.unwrap();
    assert_eq!(store.inner().order_count().await, 1);
    let checkout = checkout.into_inner();
    assert_eq!(checkout.current_step(), CheckoutStep::Confirmation);
    assert_eq!(checkout.confirmation(), Some(&confirmation));
}

#[tokio::test]
async fn test_edits_blocked_while_in_flight() {
    let checkout = Mutex::new(
        checkout_at_payment(flat_fee_builder(), vec![line(1, "99.99", 1).unwrap()]).unwrap(),
    );
    let store = GatedOrderStore::new();

    let first = async {
        let pending = checkout.lock().await.begin_submit().unwrap();
        let outcome = pending.place(&store).await;
        checkout.lock().await.finish_submit(outcome)
    };
    let second = async {
        store.wait_until_entered().await;
        {
            let mut guard = checkout.lock().await;
            assert!(matches!(
                guard.payment_form_mut(),
                Err(CheckoutError::SubmissionInProgress)
            ));
            assert!(matches!(
                guard.retreat(),
                Err(CheckoutError::SubmissionInProgress)
            ));
            assert!(matches!(
                guard.advance(),
                Err(CheckoutError::SubmissionInProgress)
            ));
            assert_eq!(guard.current_step(), CheckoutStep::Payment);
        }
        store.open();
    };

    let (confirmation, ()) = tokio::join!(first, second);

    assert!(confirmation.is_ok());
    assert_eq!(store.inner().order_count().await, 1);
}

// =============================================================================
// Outcome Routing
// =============================================================================

#[tokio::test]
async fn test_outcome_from_another_checkout_is_refused() {
    let store = InMemoryOrderStore::new();
    let mut ours =
        checkout_at_payment(flat_fee_builder(), vec![line(1, "99.99", 1).unwrap()]).unwrap();
    let mut theirs =
        checkout_at_payment(flat_fee_builder(), vec![line(2, "5.00", 1).unwrap()]).unwrap();

    let _ours_pending = ours.begin_submit().unwrap();
    let their_outcome = theirs.begin_submit().unwrap().place(&store).await;

    assert!(matches!(
        ours.finish_submit(their_outcome),
        Err(CheckoutError::OutcomeMismatch)
    ));
    assert!(ours.is_submitting());
    assert_eq!(ours.current_step(), CheckoutStep::Payment);
}

#[tokio::test]
async fn test_stray_outcome_after_confirmation_is_refused() {
    let store = InMemoryOrderStore::new();
    let mut checkout =
        checkout_at_payment(flat_fee_builder(), vec![line(1, "99.99", 1).unwrap()]).unwrap();

    let outcome = checkout.begin_submit().unwrap().place(&store).await;
    let order_id = outcome.order().unwrap().id;
    let confirmation = checkout.finish_submit(outcome).unwrap();
    assert_eq!(confirmation.order_id, order_id);

    let stray = {
        let mut other =
            checkout_at_payment(flat_fee_builder(), vec![line(1, "99.99", 1).unwrap()]).unwrap();
        other.begin_submit().unwrap().place(&store).await
    };
    assert!(matches!(
        checkout.finish_submit(stray),
        Err(CheckoutError::OutcomeMismatch)
    ));
    assert_eq!(checkout.confirmation(), Some(&confirmation));
}

// =============================================================================
// Retry After Failure
// =============================================================================

#[tokio::test]
async fn test_failed_submit_can_be_retried() {
    let store = InMemoryOrderStore::new();
    store.fail_next("connection reset").await;
    let mut checkout =
        checkout_at_payment(flat_fee_builder(), vec![line(1, "99.99", 1).unwrap()]).unwrap();

    let err = checkout.submit(&store).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Submission(_)));
    assert!(!checkout.is_submitting());
    assert_eq!(checkout.current_step(), CheckoutStep::Payment);
    assert_eq!(checkout.current_errors().first().unwrap().field, Field::Order);
    assert_eq!(store.order_count().await, 0);

    let confirmation = checkout.submit(&store).await.unwrap();
    assert!(checkout.current_errors().is_empty());
    assert_eq!(store.order_count().await, 1);
    assert!(store.get(confirmation.order_id).await.is_some());
}
