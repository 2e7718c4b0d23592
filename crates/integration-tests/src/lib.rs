//! Integration tests for Shopdesk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopdesk-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - Walking a checkout through every step
//! - `double_submit` - Concurrent submissions against one controller
//! - `order_persistence` - Store failures and what they leave behind
//! - `order_json` - Serialized shape of placed orders
//!
//! This library holds the shared fixtures and test collaborators.

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};

use shopdesk_checkout::memory::InMemoryOrderStore;
use shopdesk_checkout::{
    Cart, CartLine, CheckoutContext, CheckoutController, NewOrder, NewOrderItem, Order,
    OrderBuilder, OrderItem, OrderStore, StoreError,
};
use shopdesk_core::{Price, PriceError, ProductId, StoreId, UserId};
use tokio::sync::{Notify, Semaphore};

/// Tenant every fixture checkout runs in.
#[must_use]
pub const fn test_context() -> CheckoutContext {
    CheckoutContext::new(StoreId::new(1), UserId::new(10))
}

/// A cart line from a decimal string price.
///
/// # Errors
///
/// Returns the parse error if `unit_price` is not a valid price.
pub fn line(product: i32, unit_price: &str, quantity: u32) -> Result<CartLine, PriceError> {
    Ok(CartLine::new(
        ProductId::new(product),
        unit_price.parse()?,
        quantity,
    ))
}

/// A checkout on the payment step with valid card input, holding `lines`.
///
/// # Errors
///
/// Returns the cart error if `lines` cannot be merged, or the first step
/// that fails to advance.
pub fn checkout_at_payment(
    builder: OrderBuilder,
    lines: Vec<CartLine>,
) -> Result<CheckoutController, Box<dyn Error>> {
    let cart = Cart::from_lines(lines)?;
    let mut checkout = CheckoutController::with_cart(test_context(), builder, cart);
    checkout.advance()?;

    let form = checkout.shipping_form_mut()?;
    form.name = "Maria Silva".to_owned();
    form.email = "maria@example.com".to_owned();
    form.address = "Rua A, 123".to_owned();
    checkout.advance()?;

    let card = checkout.payment_form_mut()?;
    card.card_number = "4242 4242 4242 4242".to_owned();
    card.card_expiry = "12/29".to_owned();
    card.card_cvc = "123".to_owned();

    Ok(checkout)
}

/// An order builder with the default 15.00 fee.
#[must_use]
pub fn flat_fee_builder() -> OrderBuilder {
    OrderBuilder::new(Price::from_cents(1500))
}

/// Order store that holds every `place_order` call until [`GatedOrderStore::open`].
#[derive(Debug)]
pub struct GatedOrderStore {
    inner: InMemoryOrderStore,
    gate: Semaphore,
    entered: Notify,
}

impl GatedOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: InMemoryOrderStore::new(),
            gate: Semaphore::new(0),
            entered: Notify::new(),
        }
    }

    /// Let one waiting `place_order` call through.
    pub fn open(&self) {
        self.gate.add_permits(1);
    }

    /// Wait until a `place_order` call is parked at the gate.
    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    #[must_use]
    pub const fn inner(&self) -> &InMemoryOrderStore {
        &self.inner
    }
}

impl Default for GatedOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderStore for GatedOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        self.inner.create_order(order).await
    }

    async fn create_order_item(&self, item: NewOrderItem) -> Result<OrderItem, StoreError> {
        self.inner.create_order_item(item).await
    }

    async fn place_order(&self, order: NewOrder, lines: &[CartLine]) -> Result<Order, StoreError> {
        self.entered.notify_one();
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| StoreError::Unavailable("gate closed".to_owned()))?;
        self.inner.place_order(order, lines).await
    }
}

/// Order store without its own `place_order`, failing on the n-th item write.
///
/// Exercises the default header-then-items sequence of [`OrderStore`].
#[derive(Debug, Default)]
pub struct FailingItemStore {
    inner: InMemoryOrderStore,
    fail_at: usize,
    items_attempted: AtomicUsize,
}

impl FailingItemStore {
    /// Fail the item write with zero-based index `fail_at`.
    #[must_use]
    pub fn new(fail_at: usize) -> Self {
        Self {
            inner: InMemoryOrderStore::new(),
            fail_at,
            items_attempted: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn inner(&self) -> &InMemoryOrderStore {
        &self.inner
    }
}

impl OrderStore for FailingItemStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        self.inner.create_order(order).await
    }

    async fn create_order_item(&self, item: NewOrderItem) -> Result<OrderItem, StoreError> {
        if self.items_attempted.fetch_add(1, Ordering::SeqCst) == self.fail_at {
            return Err(StoreError::Unavailable("item write timed out".to_owned()));
        }
        self.inner.create_order_item(item).await
    }
}
