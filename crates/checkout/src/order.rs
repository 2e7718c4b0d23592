//! Order aggregate: totals, the persisted records and the builder that
//! produces them from a validated checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopdesk_core::{OrderId, OrderItemId, OrderStatus, PaymentStatus, Price, ProductId, StoreId, UserId};
use tracing::{info, instrument, warn};

use crate::cart::{CartLine, subtotal_of};
use crate::customer::CustomerDetails;
use crate::flow::CheckoutContext;
use crate::store::{OrderStore, StoreError};
use crate::validation::{Field, FieldError};

/// Errors from building or placing an order.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("cannot place an order with an empty cart")]
    EmptyCart,

    #[error("quantity {quantity} for product {product_id} must be at least 1")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// The order amount does not fit in a decimal.
    #[error("order total is too large")]
    AmountTooLarge,

    /// The product is missing from the catalog or no longer active.
    #[error("product {0} is not available")]
    UnknownProduct(ProductId),

    #[error("price of product {product_id} changed from {cart_price} to {catalog_price}")]
    StalePrice {
        product_id: ProductId,
        cart_price: Price,
        catalog_price: Price,
    },

    /// The store failed; the order must be treated as not created.
    #[error("failed to save order: {0}")]
    Persistence(#[from] StoreError),
}

impl OrderError {
    /// The error as shown next to the checkout form.
    #[must_use]
    pub fn field_error(&self) -> FieldError {
        match self {
            Self::EmptyCart => FieldError::new(Field::Cart, "Your cart is empty"),
            Self::InvalidQuantity { .. } => FieldError::new(Field::CartQuantity, self.to_string()),
            Self::AmountTooLarge => FieldError::new(Field::Cart, "Your cart total is too large"),
            Self::UnknownProduct(_) | Self::StalePrice { .. } => {
                FieldError::new(Field::Cart, self.to_string())
            }
            Self::Persistence(_) => FieldError::new(
                Field::Order,
                "We could not place your order. Please try again.",
            ),
        }
    }
}

/// Monetary totals of an order, rounded to cents.
///
/// `total == subtotal + shipping_fee` holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
}

/// A placed order line. Its price is frozen at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Price,
}

/// A placed order with the customer and line snapshot it was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub customer: CustomerDetails,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    #[must_use]
    pub const fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: self.subtotal,
            shipping_fee: self.shipping_fee,
            total: self.total,
        }
    }

    /// Total number of units across all items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// Order header handed to [`OrderStore::create_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub store_id: StoreId,
    pub user_id: UserId,
    pub customer: CustomerDetails,
    pub totals: OrderTotals,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

/// Line item handed to [`OrderStore::create_order_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Price,
}

impl NewOrderItem {
    /// Freeze a cart line as an item of `order_id`.
    #[must_use]
    pub const fn from_line(order_id: OrderId, line: &CartLine) -> Self {
        Self {
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price_at_purchase: line.unit_price,
        }
    }
}

/// Computes totals and creates orders with a flat shipping fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBuilder {
    shipping_fee: Price,
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self::new(Price::from_cents(1500))
    }
}

impl OrderBuilder {
    /// Create a builder charging `shipping_fee` per order, rounded to cents.
    #[must_use]
    pub fn new(shipping_fee: Price) -> Self {
        Self {
            shipping_fee: shipping_fee.round_cents(),
        }
    }

    #[must_use]
    pub const fn shipping_fee(&self) -> Price {
        self.shipping_fee
    }

    /// Compute the totals of `lines`.
    ///
    /// The subtotal is summed exactly and rounded once, never per line.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` if `lines` is empty,
    /// `OrderError::InvalidQuantity` for the first line with quantity zero, or
    /// `OrderError::AmountTooLarge` if the amounts overflow.
    pub fn totals(&self, lines: &[CartLine]) -> Result<OrderTotals, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }

        let subtotal = subtotal_of(lines).ok_or(OrderError::AmountTooLarge)?;
        let total = subtotal
            .checked_add(self.shipping_fee)
            .ok_or(OrderError::AmountTooLarge)?;

        Ok(OrderTotals {
            subtotal,
            shipping_fee: self.shipping_fee,
            total,
        })
    }

    /// Build the order header without touching any store.
    ///
    /// # Errors
    ///
    /// Same as [`OrderBuilder::totals`].
    pub fn prepare(
        &self,
        context: CheckoutContext,
        lines: &[CartLine],
        customer: &CustomerDetails,
    ) -> Result<NewOrder, OrderError> {
        Ok(NewOrder {
            store_id: context.store_id,
            user_id: context.user_id,
            customer: customer.clone(),
            totals: self.totals(lines)?,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
        })
    }

    /// Compute totals and persist the order with one item per line.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` / `OrderError::InvalidQuantity` before
    /// anything is written, or `OrderError::Persistence` if the store fails.
    #[instrument(
        skip(self, lines, customer, store),
        fields(store_id = %context.store_id, user_id = %context.user_id, lines = lines.len())
    )]
    pub async fn build<S: OrderStore>(
        &self,
        context: CheckoutContext,
        lines: &[CartLine],
        customer: &CustomerDetails,
        store: &S,
    ) -> Result<Order, OrderError> {
        let new_order = self.prepare(context, lines, customer)?;

        let order = store.place_order(new_order, lines).await.map_err(|e| {
            warn!(error = %e, "Order persistence failed");
            OrderError::Persistence(e)
        })?;

        info!(
            order_id = %order.id,
            total = %order.total,
            items = order.items.len(),
            "Order placed"
        );
        Ok(order)
    }
}
