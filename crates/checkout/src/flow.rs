//! The checkout flow controller.
//!
//! A checkout moves strictly forward through
//! `Cart -> Shipping -> Payment -> Confirmation`. Each step carries only the
//! data of the steps reached so far, so a controller can never hold customer
//! details without a cart or a confirmation without a placed order.
//!
//! Nothing is written anywhere until an order is submitted. Submission is
//! split in three so a caller that shares the controller can release it
//! while the store is working:
//!
//! 1. [`CheckoutController::begin_submit`] validates the payment step, marks
//!    the submission in flight and returns a [`PendingSubmission`].
//! 2. [`PendingSubmission::place`] talks to the [`OrderStore`] and yields a
//!    [`SubmissionOutcome`].
//! 3. [`CheckoutController::finish_submit`] applies the outcome.
//!
//! [`CheckoutController::submit`] runs all three. While a submission is in
//! flight every mutating call fails with [`CheckoutError::SubmissionInProgress`],
//! which is what makes a double click place a single order. Dropping a
//! `PendingSubmission` without finishing it leaves the flag set; that
//! controller cannot be used again.

use core::fmt;
use std::mem;

use serde::{Deserialize, Serialize};
use shopdesk_core::{Email, OrderId, Price, StoreId, UserId};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::cart::{Cart, CartLine};
use crate::catalog::verify_prices;
use crate::customer::{CustomerDetails, ShippingForm};
use crate::order::{Order, OrderBuilder, OrderError, OrderTotals};
use crate::payment::{PaymentDetails, PaymentForm};
use crate::store::{OrderStore, ProductCatalog};
use crate::validation::{FieldError, ValidationErrors};

/// The step a checkout is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    Cart,
    Shipping,
    Payment,
    Confirmation,
}

impl CheckoutStep {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Confirmation => "confirmation",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation requested of the controller, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Advance,
    Retreat,
    Submit,
    EditCart,
    EditShipping,
    EditPayment,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Advance => "advance",
            Self::Retreat => "go back",
            Self::Submit => "submit",
            Self::EditCart => "edit the cart",
            Self::EditShipping => "edit shipping details",
            Self::EditPayment => "edit payment details",
        })
    }
}

/// Errors from driving a checkout.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The current step has invalid fields; the step did not change.
    #[error(transparent)]
    Validation(ValidationErrors),

    #[error("cannot {action} from the {from} step")]
    InvalidTransition { from: CheckoutStep, action: Action },

    #[error("an order submission is already in progress")]
    SubmissionInProgress,

    /// Placing the order failed; the checkout stays on the payment step.
    #[error("order submission failed: {0}")]
    Submission(#[from] OrderError),

    /// A submission outcome was handed to a controller that did not issue it.
    #[error("submission outcome does not belong to this checkout")]
    OutcomeMismatch,
}

/// The tenant a checkout places its order in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutContext {
    pub store_id: StoreId,
    pub user_id: UserId,
}

impl CheckoutContext {
    #[must_use]
    pub const fn new(store_id: StoreId, user_id: UserId) -> Self {
        Self { store_id, user_id }
    }
}

/// Identifies one checkout session in logs and submission outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutId(Uuid);

impl CheckoutId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CheckoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the user sees once the order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub order_id: OrderId,
    pub total: Price,
    /// Where the confirmation email goes.
    pub customer_email: Email,
}

impl Confirmation {
    fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            total: order.total,
            customer_email: order.customer.email.clone(),
        }
    }
}

#[derive(Debug)]
enum Stage {
    Cart {
        cart: Cart,
        /// Shipping input kept when the user goes back to the cart.
        shipping_draft: Option<ShippingForm>,
    },
    Shipping {
        cart: Cart,
        form: ShippingForm,
    },
    Payment {
        cart: Cart,
        customer: CustomerDetails,
        form: PaymentForm,
    },
    Confirmation(Confirmation),
}

impl Default for Stage {
    fn default() -> Self {
        Self::Cart {
            cart: Cart::new(),
            shipping_draft: None,
        }
    }
}

impl Stage {
    const fn step(&self) -> CheckoutStep {
        match self {
            Self::Cart { .. } => CheckoutStep::Cart,
            Self::Shipping { .. } => CheckoutStep::Shipping,
            Self::Payment { .. } => CheckoutStep::Payment,
            Self::Confirmation(_) => CheckoutStep::Confirmation,
        }
    }
}

/// Drives one user through checkout.
///
/// Owned by a single session; methods take `&mut self` and the only await
/// point is inside submission.
#[derive(Debug)]
pub struct CheckoutController {
    id: CheckoutId,
    context: CheckoutContext,
    builder: OrderBuilder,
    stage: Stage,
    errors: Vec<FieldError>,
    submitting: bool,
}

impl CheckoutController {
    /// Start a checkout on the cart step with an empty cart.
    #[must_use]
    pub fn new(context: CheckoutContext, builder: OrderBuilder) -> Self {
        Self::with_cart(context, builder, Cart::new())
    }

    /// Start a checkout on the cart step with `cart`.
    #[must_use]
    pub fn with_cart(context: CheckoutContext, builder: OrderBuilder, cart: Cart) -> Self {
        let id = CheckoutId::generate();
        info!(checkout_id = %id, store_id = %context.store_id, "Checkout started");
        Self {
            id,
            context,
            builder,
            stage: Stage::Cart {
                cart,
                shipping_draft: None,
            },
            errors: Vec::new(),
            submitting: false,
        }
    }

    #[must_use]
    pub const fn id(&self) -> CheckoutId {
        self.id
    }

    #[must_use]
    pub const fn context(&self) -> CheckoutContext {
        self.context
    }

    #[must_use]
    pub const fn current_step(&self) -> CheckoutStep {
        self.stage.step()
    }

    /// Errors of the last failed advance or submission.
    #[must_use]
    pub fn current_errors(&self) -> &[FieldError] {
        &self.errors
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// The cart, on every step before confirmation.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        match &self.stage {
            Stage::Cart { cart, .. } | Stage::Shipping { cart, .. } | Stage::Payment { cart, .. } => {
                Some(cart)
            }
            Stage::Confirmation(_) => None,
        }
    }

    /// Validated customer details, on the payment step.
    #[must_use]
    pub const fn customer(&self) -> Option<&CustomerDetails> {
        match &self.stage {
            Stage::Payment { customer, .. } => Some(customer),
            _ => None,
        }
    }

    #[must_use]
    pub const fn confirmation(&self) -> Option<&Confirmation> {
        match &self.stage {
            Stage::Confirmation(confirmation) => Some(confirmation),
            _ => None,
        }
    }

    /// Totals the order would have if placed now.
    #[must_use]
    pub fn totals_preview(&self) -> Option<OrderTotals> {
        self.cart()
            .and_then(|cart| self.builder.totals(cart.lines()).ok())
    }

    /// Edit the cart.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the cart step, `SubmissionInProgress`
    /// while an order is being placed.
    pub fn cart_mut(&mut self) -> Result<&mut Cart, CheckoutError> {
        self.ensure_idle()?;
        let from = self.current_step();
        match &mut self.stage {
            Stage::Cart { cart, .. } => Ok(cart),
            _ => Err(CheckoutError::InvalidTransition {
                from,
                action: Action::EditCart,
            }),
        }
    }

    /// Edit the shipping form.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the shipping step, `SubmissionInProgress`
    /// while an order is being placed.
    pub fn shipping_form_mut(&mut self) -> Result<&mut ShippingForm, CheckoutError> {
        self.ensure_idle()?;
        let from = self.current_step();
        match &mut self.stage {
            Stage::Shipping { form, .. } => Ok(form),
            _ => Err(CheckoutError::InvalidTransition {
                from,
                action: Action::EditShipping,
            }),
        }
    }

    /// Edit the payment form.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the payment step, `SubmissionInProgress`
    /// while an order is being placed.
    pub fn payment_form_mut(&mut self) -> Result<&mut PaymentForm, CheckoutError> {
        self.ensure_idle()?;
        let from = self.current_step();
        match &mut self.stage {
            Stage::Payment { form, .. } => Ok(form),
            _ => Err(CheckoutError::InvalidTransition {
                from,
                action: Action::EditPayment,
            }),
        }
    }

    /// Validate the current step and move to the next one.
    ///
    /// The payment step is left only through [`Self::submit`].
    ///
    /// # Errors
    ///
    /// `Validation` if a field is invalid (the step does not change),
    /// `InvalidTransition` on the payment and confirmation steps,
    /// `SubmissionInProgress` while an order is being placed.
    pub fn advance(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_idle()?;
        let from = self.current_step();

        let (stage, outcome) = match mem::take(&mut self.stage) {
            Stage::Cart {
                cart,
                shipping_draft,
            } => match cart.validate() {
                Ok(()) => (
                    Stage::Shipping {
                        cart,
                        form: shipping_draft.unwrap_or_default(),
                    },
                    Ok(()),
                ),
                Err(e) => (
                    Stage::Cart {
                        cart,
                        shipping_draft,
                    },
                    Err(e),
                ),
            },
            Stage::Shipping { cart, form } => match form.validate() {
                Ok(customer) => (
                    Stage::Payment {
                        cart,
                        customer,
                        form: PaymentForm::default(),
                    },
                    Ok(()),
                ),
                Err(e) => (Stage::Shipping { cart, form }, Err(e)),
            },
            stage @ (Stage::Payment { .. } | Stage::Confirmation(_)) => {
                self.stage = stage;
                return Err(CheckoutError::InvalidTransition {
                    from,
                    action: Action::Advance,
                });
            }
        };
        self.stage = stage;

        match outcome {
            Ok(()) => {
                self.errors.clear();
                let to = self.current_step();
                info!(checkout_id = %self.id, %from, %to, "Checkout advanced");
                Ok(to)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Go back one step without validating.
    ///
    /// Going back from shipping keeps the shipping input for later. Going back
    /// from payment discards the card input.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` on the cart and confirmation steps (nothing
    /// changes), `SubmissionInProgress` while an order is being placed.
    pub fn retreat(&mut self) -> Result<CheckoutStep, CheckoutError> {
        self.ensure_idle()?;
        let from = self.current_step();

        self.stage = match mem::take(&mut self.stage) {
            Stage::Shipping { cart, form } => Stage::Cart {
                cart,
                shipping_draft: Some(form),
            },
            Stage::Payment { cart, customer, .. } => Stage::Shipping {
                cart,
                form: ShippingForm::from(customer),
            },
            stage @ (Stage::Cart { .. } | Stage::Confirmation(_)) => {
                self.stage = stage;
                return Err(CheckoutError::InvalidTransition {
                    from,
                    action: Action::Retreat,
                });
            }
        };

        self.errors.clear();
        let to = self.current_step();
        info!(checkout_id = %self.id, %from, %to, "Checkout went back");
        Ok(to)
    }

    /// Validate the payment step and mark a submission in flight.
    ///
    /// # Errors
    ///
    /// `SubmissionInProgress` if a submission is already in flight,
    /// `InvalidTransition` outside the payment step, `Validation` if a card
    /// field is invalid.
    pub fn begin_submit(&mut self) -> Result<PendingSubmission, CheckoutError> {
        if self.submitting {
            warn!(checkout_id = %self.id, "Duplicate submission rejected");
            return Err(CheckoutError::SubmissionInProgress);
        }
        let Stage::Payment {
            cart,
            customer,
            form,
        } = &self.stage
        else {
            return Err(CheckoutError::InvalidTransition {
                from: self.current_step(),
                action: Action::Submit,
            });
        };

        let payment = match form.validate() {
            Ok(payment) => payment,
            Err(e) => return Err(self.reject(e)),
        };
        let pending = PendingSubmission {
            checkout_id: self.id,
            context: self.context,
            builder: self.builder,
            lines: cart.lines().to_vec(),
            customer: customer.clone(),
            payment,
        };

        self.submitting = true;
        self.errors.clear();
        info!(checkout_id = %self.id, "Order submission started");
        Ok(pending)
    }

    /// Apply the outcome of a submission started with [`Self::begin_submit`].
    ///
    /// On success the checkout moves to confirmation; on failure it stays on
    /// the payment step with the error in [`Self::current_errors`].
    ///
    /// # Errors
    ///
    /// `OutcomeMismatch` if the outcome came from another controller or no
    /// submission is in flight, `Submission` if placing the order failed.
    pub fn finish_submit(&mut self, outcome: SubmissionOutcome) -> Result<Confirmation, CheckoutError> {
        if outcome.checkout_id != self.id || !self.submitting {
            return Err(CheckoutError::OutcomeMismatch);
        }
        self.submitting = false;

        match outcome.result {
            Ok(order) => {
                let confirmation = Confirmation::from_order(&order);
                self.stage = Stage::Confirmation(confirmation.clone());
                self.errors.clear();
                info!(
                    checkout_id = %self.id,
                    order_id = %confirmation.order_id,
                    total = %confirmation.total,
                    "Checkout confirmed"
                );
                Ok(confirmation)
            }
            Err(e) => {
                warn!(checkout_id = %self.id, error = %e, "Order submission failed");
                self.errors = vec![e.field_error()];
                Err(CheckoutError::Submission(e))
            }
        }
    }

    /// Place the order and move to confirmation.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_submit`] and [`Self::finish_submit`].
    #[instrument(skip_all, fields(checkout_id = %self.id))]
    pub async fn submit<S: OrderStore>(&mut self, store: &S) -> Result<Confirmation, CheckoutError> {
        let pending = self.begin_submit()?;
        let outcome = pending.place(store).await;
        self.finish_submit(outcome)
    }

    /// Like [`Self::submit`], but first check cart prices against `catalog`.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`]; a failed price check is a `Submission` error and
    /// nothing is written.
    #[instrument(skip_all, fields(checkout_id = %self.id))]
    pub async fn submit_verified<S: OrderStore, C: ProductCatalog>(
        &mut self,
        store: &S,
        catalog: &C,
    ) -> Result<Confirmation, CheckoutError> {
        let pending = self.begin_submit()?;
        let outcome = pending.place_verified(store, catalog).await;
        self.finish_submit(outcome)
    }

    const fn ensure_idle(&self) -> Result<(), CheckoutError> {
        if self.submitting {
            Err(CheckoutError::SubmissionInProgress)
        } else {
            Ok(())
        }
    }

    fn reject(&mut self, errors: ValidationErrors) -> CheckoutError {
        warn!(
            checkout_id = %self.id,
            step = %self.current_step(),
            %errors,
            "Checkout step failed validation"
        );
        self.errors = errors.errors().to_vec();
        CheckoutError::Validation(errors)
    }
}

/// A validated order on its way to the store.
///
/// Holds a copy of everything needed to place the order, so the controller
/// can be released while [`PendingSubmission::place`] runs.
#[derive(Debug)]
pub struct PendingSubmission {
    checkout_id: CheckoutId,
    context: CheckoutContext,
    builder: OrderBuilder,
    lines: Vec<CartLine>,
    customer: CustomerDetails,
    payment: PaymentDetails,
}

impl PendingSubmission {
    #[must_use]
    pub const fn checkout_id(&self) -> CheckoutId {
        self.checkout_id
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub const fn customer(&self) -> &CustomerDetails {
        &self.customer
    }

    /// The card the order would be charged to. It is never stored.
    #[must_use]
    pub const fn payment(&self) -> &PaymentDetails {
        &self.payment
    }

    /// Build and persist the order.
    #[instrument(skip_all, fields(checkout_id = %self.checkout_id, store_id = %self.context.store_id))]
    pub async fn place<S: OrderStore>(self, store: &S) -> SubmissionOutcome {
        let result = self
            .builder
            .build(self.context, &self.lines, &self.customer, store)
            .await;
        SubmissionOutcome {
            checkout_id: self.checkout_id,
            result,
        }
    }

    /// Check prices against `catalog`, then build and persist the order.
    #[instrument(skip_all, fields(checkout_id = %self.checkout_id, store_id = %self.context.store_id))]
    pub async fn place_verified<S: OrderStore, C: ProductCatalog>(
        self,
        store: &S,
        catalog: &C,
    ) -> SubmissionOutcome {
        if let Err(e) = verify_prices(catalog, &self.lines).await {
            return SubmissionOutcome {
                checkout_id: self.checkout_id,
                result: Err(e),
            };
        }
        self.place(store).await
    }
}

/// Result of [`PendingSubmission::place`], to be handed back to the
/// controller that issued it.
#[derive(Debug)]
#[must_use = "a submission outcome must be passed to finish_submit"]
pub struct SubmissionOutcome {
    checkout_id: CheckoutId,
    result: Result<Order, OrderError>,
}

impl SubmissionOutcome {
    #[must_use]
    pub const fn checkout_id(&self) -> CheckoutId {
        self.checkout_id
    }

    /// The placed order, if the submission succeeded.
    #[must_use]
    pub fn order(&self) -> Option<&Order> {
        self.result.as_ref().ok()
    }
}
