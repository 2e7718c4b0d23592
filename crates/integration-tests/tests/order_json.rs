//! Integration tests for the serialized shape of placed orders.
//!
//! Orders and confirmations are rendered as JSON by the CLI. Money goes out as
//! decimal strings and card details never appear.

#![allow(clippy::unwrap_used)]

use serde_json::{Value, json};
use shopdesk_checkout::CheckoutStep;
use shopdesk_checkout::memory::InMemoryOrderStore;
use shopdesk_integration_tests::{checkout_at_payment, flat_fee_builder, line};

// =============================================================================
// Placed Order
// =============================================================================

#[tokio::test]
async fn test_order_json_shape() {
    let store = InMemoryOrderStore::new();
    let mut checkout =
        checkout_at_payment(flat_fee_builder(), vec![line(1, "99.99", 1).unwrap()]).unwrap();
    let confirmation = checkout.submit(&store).await.unwrap();
    let order = store.get(confirmation.order_id).await.unwrap();

    let value = serde_json::to_value(&order).unwrap();

    assert_eq!(value["subtotal"], json!("99.99"));
    assert_eq!(value["shipping_fee"], json!("15.00"));
    assert_eq!(value["total"], json!("114.99"));
    assert_eq!(value["status"], json!("pending"));
    assert_eq!(value["payment_status"], json!("pending"));
    assert_eq!(value["customer"]["email"], json!("maria@example.com"));
    assert_eq!(value["customer"]["phone"], Value::Null);
    assert_eq!(value["items"][0]["price_at_purchase"], json!("99.99"));
}

#[tokio::test]
async fn test_order_json_has_no_card_details() {
    let store = InMemoryOrderStore::new();
    let mut checkout =
        checkout_at_payment(flat_fee_builder(), vec![line(1, "99.99", 1).unwrap()]).unwrap();
    let confirmation = checkout.submit(&store).await.unwrap();
    let order = store.get(confirmation.order_id).await.unwrap();

    let json = serde_json::to_string(&order).unwrap();

    assert!(!json.contains("card"));
    assert!(!json.contains("cvc"));
}

// =============================================================================
// Confirmation
// =============================================================================

#[tokio::test]
async fn test_confirmation_json() {
    let store = InMemoryOrderStore::new();
    let mut checkout =
        checkout_at_payment(flat_fee_builder(), vec![line(1, "99.99", 1).unwrap()]).unwrap();
    let confirmation = checkout.submit(&store).await.unwrap();

    let value = serde_json::to_value(&confirmation).unwrap();

    assert_eq!(
        value,
        json!({
            "order_id": confirmation.order_id.as_i32(),
            "total": "114.99",
            "customer_email": "maria@example.com",
        })
    );
}

#[test]
fn test_step_names() {
    let steps: Vec<Value> = [
        CheckoutStep::Cart,
        CheckoutStep::Shipping,
        CheckoutStep::Payment,
        CheckoutStep::Confirmation,
    ]
    .iter()
    .map(|step| serde_json::to_value(step).unwrap())
    .collect();

    assert_eq!(
        steps,
        vec![
            json!("cart"),
            json!("shipping"),
            json!("payment"),
            json!("confirmation"),
        ]
    );
}
