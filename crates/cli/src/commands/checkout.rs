//! Checkout command: runs every checkout step from command-line input.
//!
//! # Usage
//!
//! ```bash
//! shopdesk checkout --store 1 --user 1 \
//!     --line 1:99.99:1 --line 7:5.00:2 \
//!     --name "Maria Silva" --email maria@example.com --address "Rua A, 123" \
//!     --card "4242 4242 4242 4242" --expiry 12/29 --cvc 123 [--dry-run] [--json]
//! ```
//!
//! With `--dry-run` the order goes to an in-memory store and nothing touches
//! the database.

use core::str::FromStr;

use clap::Args;
use serde::Serialize;
use shopdesk_checkout::db::{PgOrderStore, PgProductCatalog};
use shopdesk_checkout::memory::InMemoryOrderStore;
use shopdesk_checkout::{
    Cart, CartError, CartLine, CheckoutConfig, CheckoutContext, CheckoutController, CheckoutError, CheckoutId,
    Order, StoreError,
};
use shopdesk_core::{OrderId, Price, ProductId, StoreId, UserId};
use thiserror::Error;

use super::orders::{OrdersError, print, render_order};
use super::{DatabaseSetupError, connect};

/// Arguments of `shopdesk checkout`.
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Store the order is placed in
    #[arg(long)]
    pub store: StoreId,

    /// User placing the order
    #[arg(long)]
    pub user: UserId,

    /// Cart line, repeatable
    #[arg(long = "line", value_name = "PRODUCT:PRICE:QTY", required = true)]
    pub lines: Vec<LineArg>,

    /// Customer name
    #[arg(long)]
    pub name: String,

    /// Customer email
    #[arg(long)]
    pub email: String,

    /// Customer phone
    #[arg(long, default_value = "")]
    pub phone: String,

    /// Shipping address
    #[arg(long)]
    pub address: String,

    /// Card number
    #[arg(long)]
    pub card: String,

    /// Card expiry (MM/YY)
    #[arg(long)]
    pub expiry: String,

    /// Card CVC
    #[arg(long)]
    pub cvc: String,

    /// Place the order in memory instead of the database
    #[arg(long)]
    pub dry_run: bool,

    /// Print JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// A `PRODUCT:PRICE:QTY` cart line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineArg(CartLine);

impl FromStr for LineArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(product), Some(price), Some(quantity), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected PRODUCT:PRICE:QTY, got {s:?}"));
        };

        let product: ProductId = product
            .parse()
            .map_err(|e| format!("invalid product id {product:?}: {e}"))?;
        let price: Price = price.parse().map_err(|e| format!("{e}"))?;
        let quantity: u32 = quantity
            .trim()
            .parse()
            .map_err(|e| format!("invalid quantity {quantity:?}: {e}"))?;

        Ok(Self(CartLine::new(product, price, quantity)))
    }
}

/// Errors that can occur while running a checkout.
#[derive(Debug, Error)]
pub enum CheckoutCommandError {
    #[error(transparent)]
    Setup(#[from] DatabaseSetupError),

    #[error("Invalid cart: {0}")]
    Cart(#[from] CartError),

    #[error("Checkout failed: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Failed to read placed order: {0}")]
    Store(#[from] StoreError),

    #[error("Placed order {0} could not be read back")]
    Missing(OrderId),

    #[error(transparent)]
    Output(#[from] OrdersError),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct CheckoutReport<'a> {
    checkout_id: CheckoutId,
    dry_run: bool,
    order: &'a Order,
}

/// Run the checkout flow and place the order.
///
/// # Errors
///
/// Returns `CheckoutCommandError` if a step fails validation or the order
/// cannot be placed.
pub async fn run(config: &CheckoutConfig, args: CheckoutArgs) -> Result<(), CheckoutCommandError> {
    let mut checkout = fill_checkout(config, &args)?;

    let order = if args.dry_run {
        if config.verify_prices {
            tracing::warn!("Price verification is skipped in dry-run mode");
        }
        let store = InMemoryOrderStore::new();
        let confirmation = checkout.submit(&store).await?;
        store
            .get(confirmation.order_id)
            .await
            .ok_or(CheckoutCommandError::Missing(confirmation.order_id))?
    } else {
        let pool = connect(config).await?;
        let store = PgOrderStore::new(pool.clone());
        let confirmation = if config.verify_prices {
            checkout
                .submit_verified(&store, &PgProductCatalog::new(pool))
                .await?
        } else {
            checkout.submit(&store).await?
        };
        store
            .get_order(confirmation.order_id)
            .await?
            .ok_or(CheckoutCommandError::Missing(confirmation.order_id))?
    };

    let output = if args.json {
        serde_json::to_string_pretty(&CheckoutReport {
            checkout_id: checkout.id(),
            dry_run: args.dry_run,
            order: &order,
        })?
    } else {
        format!(
            "{}\n\nA confirmation email will be sent to {}",
            render_order(&order),
            order.customer.email
        )
    };
    print(&output)?;
    Ok(())
}

/// Build a controller and walk it to the payment step with `args`.
fn fill_checkout(
    config: &CheckoutConfig,
    args: &CheckoutArgs,
) -> Result<CheckoutController, CheckoutCommandError> {
    let cart = Cart::from_lines(args.lines.iter().map(|line| line.0.clone()))?;
    let mut checkout = CheckoutController::with_cart(
        CheckoutContext::new(args.store, args.user),
        config.order_builder(),
        cart,
    );

    step(&mut checkout)?;

    let form = checkout.shipping_form_mut()?;
    form.name.clone_from(&args.name);
    form.email.clone_from(&args.email);
    form.phone.clone_from(&args.phone);
    form.address.clone_from(&args.address);
    step(&mut checkout)?;

    let form = checkout.payment_form_mut()?;
    form.card_number.clone_from(&args.card);
    form.card_expiry.clone_from(&args.expiry);
    form.card_cvc.clone_from(&args.cvc);

    Ok(checkout)
}

/// Advance one step, logging each rejected field.
fn step(checkout: &mut CheckoutController) -> Result<(), CheckoutError> {
    checkout.advance().map(|_| ()).inspect_err(|_| {
        for error in checkout.current_errors() {
            tracing::error!(field = %error.field, "{}", error.message);
        }
    })
}
