//! Order inspection commands.
//!
//! # Usage
//!
//! ```bash
//! shopdesk orders list --store 1
//! shopdesk orders show 42 --json
//! ```

use core::fmt::Write as _;
use std::io::Write as _;

use shopdesk_checkout::db::PgOrderStore;
use shopdesk_checkout::{CheckoutConfig, Order, StoreError};
use shopdesk_core::{OrderId, StoreId};
use thiserror::Error;

use super::{DatabaseSetupError, connect};

/// Errors that can occur while inspecting orders.
#[derive(Debug, Error)]
pub enum OrdersError {
    #[error(transparent)]
    Setup(#[from] DatabaseSetupError),

    #[error("Failed to read orders: {0}")]
    Store(#[from] StoreError),

    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// List a store's orders.
///
/// # Errors
///
/// Returns `OrdersError` if the database cannot be read.
pub async fn list(config: &CheckoutConfig, store_id: StoreId, json: bool) -> Result<(), OrdersError> {
    let store = PgOrderStore::new(connect(config).await?);
    let orders = store.list_by_store(store_id).await?;
    tracing::info!(store_id = %store_id, count = orders.len(), "Loaded orders");

    let output = if json {
        serde_json::to_string_pretty(&orders)?
    } else if orders.is_empty() {
        format!("No orders for store {store_id}")
    } else {
        orders.iter().map(summary_line).collect::<Vec<_>>().join("\n")
    };
    print(&output)
}

/// Show one order in full.
///
/// # Errors
///
/// Returns `OrdersError::NotFound` if the order does not exist.
pub async fn show(config: &CheckoutConfig, id: OrderId, json: bool) -> Result<(), OrdersError> {
    let store = PgOrderStore::new(connect(config).await?);
    let order = store.get_order(id).await?.ok_or(OrdersError::NotFound(id))?;

    let output = if json {
        serde_json::to_string_pretty(&order)?
    } else {
        render_order(&order)
    };
    print(&output)
}

/// Write command output to stdout.
pub(crate) fn print(output: &str) -> Result<(), OrdersError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}

/// One line per order for listings.
pub(crate) fn summary_line(order: &Order) -> String {
    format!(
        "#{:<6} {}  {:<10} {:<8} {:>10}  {}",
        order.id,
        order.created_at.format("%Y-%m-%d %H:%M"),
        order.status,
        order.payment_status,
        order.total,
        order.customer.email,
    )
}

/// Full order breakdown.
pub(crate) fn render_order(order: &Order) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Order #{} ({} / payment {})",
        order.id, order.status, order.payment_status
    );
    let _ = writeln!(out, "Customer: {} <{}>", order.customer.name, order.customer.email);
    if let Some(phone) = &order.customer.phone {
        let _ = writeln!(out, "Phone:    {phone}");
    }
    let _ = writeln!(out, "Ship to:  {}", order.customer.shipping_address);
    let _ = writeln!(out);
    for item in &order.items {
        let _ = writeln!(
            out,
            "  product {:<6} x{:<4} @ {:>10}",
            item.product_id, item.quantity, item.price_at_purchase
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  Subtotal {:>10}", order.subtotal);
    let _ = writeln!(out, "  Shipping {:>10}", order.shipping_fee);
    let _ = write!(out, "  Total    {:>10}", order.total);
    out
}
