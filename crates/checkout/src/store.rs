//! Collaborators the checkout core persists orders to and reads prices from.
//!
//! Both traits use `impl Future + Send` return types so implementations can
//! be plain `async fn`s while callers can still spawn the futures.

use std::future::Future;

use serde::{Deserialize, Serialize};
use shopdesk_core::{Price, ProductId};

use crate::cart::CartLine;
use crate::order::{NewOrder, NewOrderItem, Order, OrderItem};

/// Errors raised by an [`OrderStore`] or [`ProductCatalog`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (constraint violation, unknown reference).
    #[error("write rejected: {0}")]
    Rejected(String),

    /// Data read back from the store is invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Database error from sqlx.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for placed orders.
///
/// An order and its items must become visible together or not at all.
/// Stores that can offer that should override [`OrderStore::place_order`];
/// the default writes the header and then each item, and reports the first
/// failure.
pub trait OrderStore: Send + Sync {
    /// Insert an order header and return it with its assigned ID and no items.
    fn create_order(
        &self,
        order: NewOrder,
    ) -> impl Future<Output = Result<Order, StoreError>> + Send;

    /// Insert one line item of an existing order.
    fn create_order_item(
        &self,
        item: NewOrderItem,
    ) -> impl Future<Output = Result<OrderItem, StoreError>> + Send;

    /// Insert an order together with one item per cart line.
    fn place_order(
        &self,
        order: NewOrder,
        lines: &[CartLine],
    ) -> impl Future<Output = Result<Order, StoreError>> + Send {
        async move {
            let mut placed = self.create_order(order).await?;
            for line in lines {
                let item = self
                    .create_order_item(NewOrderItem::from_line(placed.id, line))
                    .await?;
                placed.items.push(item);
            }
            Ok(placed)
        }
    }
}

/// A product as the catalog currently lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub price: Price,
    pub is_active: bool,
}

/// Read access to the product catalog.
pub trait ProductCatalog: Send + Sync {
    /// Look up a product; `None` if it does not exist.
    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<CatalogProduct>, StoreError>> + Send;
}
