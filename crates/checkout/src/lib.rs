//! Shopdesk checkout.
//!
//! Drives a purchase through `cart -> shipping -> payment -> confirmation`
//! and turns the result into a persisted order with exact decimal totals.
//!
//! # Modules
//!
//! - [`flow`] - The [`CheckoutController`] state machine and submission
//! - [`order`] - Totals, order records and the [`OrderBuilder`]
//! - [`cart`], [`customer`], [`payment`] - Per-step input and validation
//! - [`store`] - [`OrderStore`] and [`ProductCatalog`] collaborator traits
//! - [`memory`] - In-memory collaborators for tests and dry runs
//! - [`config`] - Environment configuration
//! - `db` - `PostgreSQL` collaborators (feature `postgres`)
//!
//! # Example
//!
//! ```
//! use shopdesk_checkout::memory::InMemoryOrderStore;
//! use shopdesk_checkout::{CheckoutContext, CheckoutController, CheckoutStep, OrderBuilder};
//! use shopdesk_core::{ProductId, StoreId, UserId};
//!
//! # tokio_test_block(async {
//! let store = InMemoryOrderStore::new();
//! let mut checkout = CheckoutController::new(
//!     CheckoutContext::new(StoreId::new(1), UserId::new(1)),
//!     OrderBuilder::new("15.00".parse().unwrap()),
//! );
//!
//! checkout.cart_mut().unwrap().add(ProductId::new(1), "99.99".parse().unwrap(), 1).unwrap();
//! checkout.advance().unwrap();
//!
//! let form = checkout.shipping_form_mut().unwrap();
//! form.name = "Maria Silva".into();
//! form.email = "maria@example.com".into();
//! form.address = "Rua A, 123".into();
//! checkout.advance().unwrap();
//!
//! let card = checkout.payment_form_mut().unwrap();
//! card.card_number = "4242 4242 4242 4242".into();
//! card.card_expiry = "12/29".into();
//! card.card_cvc = "123".into();
//!
//! let confirmation = checkout.submit(&store).await.unwrap();
//! assert_eq!(checkout.current_step(), CheckoutStep::Confirmation);
//! assert_eq!(confirmation.total.to_string(), "114.99");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod customer;
#[cfg(feature = "postgres")]
pub mod db;
pub mod flow;
pub mod memory;
pub mod order;
pub mod payment;
pub mod store;
pub mod validation;

pub use cart::{Cart, CartError, CartLine};
pub use catalog::verify_prices;
pub use config::{CheckoutConfig, ConfigError};
pub use customer::{CustomerDetails, ShippingForm};
pub use flow::{
    Action, CheckoutContext, CheckoutController, CheckoutError, CheckoutId, CheckoutStep,
    Confirmation, PendingSubmission, SubmissionOutcome,
};
pub use order::{NewOrder, NewOrderItem, Order, OrderBuilder, OrderError, OrderItem, OrderTotals};
pub use payment::{CardExpiry, PaymentDetails, PaymentForm};
pub use store::{CatalogProduct, OrderStore, ProductCatalog, StoreError};
pub use validation::{Field, FieldError, ValidationErrors};
