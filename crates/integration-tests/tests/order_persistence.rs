//! Integration tests for order persistence failures.
//!
//! The order header and its items are written through [`OrderStore`]; these
//! tests cover what the checkout reports when a write fails part way.

#![allow(clippy::unwrap_used)]

use shopdesk_checkout::memory::InMemoryOrderStore;
use shopdesk_checkout::{
    CheckoutError, CheckoutStep, CustomerDetails, Field, OrderError, StoreError,
};
use shopdesk_core::{Email, OrderId};
use shopdesk_integration_tests::{
    FailingItemStore, checkout_at_payment, flat_fee_builder, line, test_context,
};

fn customer() -> CustomerDetails {
    CustomerDetails {
        name: "Maria Silva".to_owned(),
        email: Email::parse("maria@example.com").unwrap(),
        phone: None,
        shipping_address: "Rua A, 123".to_owned(),
    }
}

// =============================================================================
// Item Write Failures
// =============================================================================

#[tokio::test]
async fn test_item_failure_is_not_a_placed_order() {
    let store = FailingItemStore::new(1);
    let lines = vec![line(1, "10.00", 1).unwrap(), line(2, "20.00", 1).unwrap()];
    let mut checkout = checkout_at_payment(flat_fee_builder(), lines).unwrap();

    let err = checkout.submit(&store).await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Submission(OrderError::Persistence(StoreError::Unavailable(_)))
    ));
    assert_eq!(checkout.current_step(), CheckoutStep::Payment);
    assert!(checkout.confirmation().is_none());
    assert!(!checkout.is_submitting());

    let errors = checkout.current_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.first().unwrap().field, Field::Order);
    assert_eq!(
        errors.first().unwrap().message,
        "We could not place your order. Please try again."
    );
}

#[tokio::test]
async fn test_sequential_writes_leave_partial_header() {
    // Stores without their own place_order write the header first.
    let store = FailingItemStore::new(1);
    let lines = vec![line(1, "10.00", 1).unwrap(), line(2, "20.00", 1).unwrap()];

    let result = flat_fee_builder()
        .build(test_context(), &lines, &customer(), &store)
        .await;

    assert!(matches!(result, Err(OrderError::Persistence(_))));
    let partial = store.inner().get(OrderId::new(1)).await.unwrap();
    assert_eq!(partial.items.len(), 1);
}

// =============================================================================
// Atomic Store
// =============================================================================

#[tokio::test]
async fn test_atomic_store_writes_nothing_on_failure() {
    let store = InMemoryOrderStore::new();
    store.fail_next("disk full").await;
    let lines = vec![line(1, "10.00", 1).unwrap(), line(2, "20.00", 1).unwrap()];

    let result = flat_fee_builder()
        .build(test_context(), &lines, &customer(), &store)
        .await;

    assert!(matches!(result, Err(OrderError::Persistence(_))));
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn test_items_record_purchase_price() {
    let store = InMemoryOrderStore::new();
    let lines = vec![line(1, "10.005", 2).unwrap(), line(2, "20.00", 1).unwrap()];

    let order = flat_fee_builder()
        .build(test_context(), &lines, &customer(), &store)
        .await
        .unwrap();

    assert_eq!(order.items.len(), 2);
    let prices: Vec<String> = order
        .items
        .iter()
        .map(|item| item.price_at_purchase.amount().to_string())
        .collect();
    assert_eq!(prices, vec!["10.005", "20.00"]);
    assert_eq!(order.subtotal.to_string(), "40.01");
    assert_eq!(order.total.to_string(), "55.01");
}

#[tokio::test]
async fn test_builder_rejects_empty_cart_before_writing() {
    let store = InMemoryOrderStore::new();

    let result = flat_fee_builder()
        .build(test_context(), &[], &customer(), &store)
        .await;

    assert!(matches!(result, Err(OrderError::EmptyCart)));
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn test_orders_listed_newest_first() {
    let store = InMemoryOrderStore::new();
    for product in 1..=3 {
        flat_fee_builder()
            .build(
                test_context(),
                &[line(product, "1.00", 1).unwrap()],
                &customer(),
                &store,
            )
            .await
            .unwrap();
    }

    let ids: Vec<OrderId> = store
        .list_by_store(test_context().store_id)
        .await
        .iter()
        .map(|order| order.id)
        .collect();
    assert_eq!(ids, vec![OrderId::new(3), OrderId::new(2), OrderId::new(1)]);
}
