//! Cart lines held by the checkout controller.

use serde::{Deserialize, Serialize};
use shopdesk_core::{Price, ProductId};

use crate::validation::{Field, FieldError, ValidationErrors};

/// Errors from editing the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Merging the quantity into the existing line would overflow.
    #[error("quantity of product {0} is too large")]
    QuantityOverflow(ProductId),
}

/// One product selected for purchase.
///
/// `quantity` is only checked when the cart step is advanced and when the
/// order is built, so a line can hold `0` while the user is editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub unit_price: Price,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub const fn new(product_id: ProductId, unit_price: Price, quantity: u32) -> Self {
        Self {
            product_id,
            unit_price,
            quantity,
        }
    }

    /// `unit_price × quantity`, unrounded. `None` if it overflows.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// The set of lines being checked out. At most one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from lines, merging repeated products like [`Cart::add`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityOverflow` if merged quantities overflow.
    pub fn from_lines<I>(lines: I) -> Result<Self, CartError>
    where
        I: IntoIterator<Item = CartLine>,
    {
        let mut cart = Self::new();
        for line in lines {
            cart.add(line.product_id, line.unit_price, line.quantity)?;
        }
        Ok(cart)
    }

    /// Add `quantity` of a product. A product already in the cart keeps its
    /// position, gains the quantity and takes the newer unit price.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityOverflow` if the merged quantity does not
    /// fit; the cart is left unchanged.
    pub fn add(
        &mut self,
        product_id: ProductId,
        unit_price: Price,
        quantity: u32,
    ) -> Result<(), CartError> {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::QuantityOverflow(product_id))?;
            line.unit_price = unit_price;
        } else {
            self.lines
                .push(CartLine::new(product_id, unit_price, quantity));
        }
        Ok(())
    }

    /// Set a line's quantity; `0` removes the line. Returns false if the
    /// product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        match self.line_mut(product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a product's line. Returns false if it was not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Subtotal preview, rounded to cents the same way the placed order is.
    /// `None` if the amount overflows.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        subtotal_of(&self.lines)
    }

    /// Check the cart can move on to shipping.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` on [`Field::Cart`] when empty and on
    /// [`Field::CartQuantity`] when a line has quantity zero. A subtotal too
    /// large to compute is also reported on [`Field::Cart`].
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        if self.lines.is_empty() {
            errors.push(FieldError::new(Field::Cart, "Your cart is empty"));
        } else if self.subtotal().is_none() {
            errors.push(FieldError::new(Field::Cart, "Your cart total is too large"));
        }
        for line in self.lines.iter().filter(|line| line.quantity == 0) {
            errors.push(FieldError::new(
                Field::CartQuantity,
                format!("Quantity for product {} must be at least 1", line.product_id),
            ));
        }
        ValidationErrors::check(errors)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

/// Exact sum of the line totals, rounded once to cents.
pub(crate) fn subtotal_of(lines: &[CartLine]) -> Option<Price> {
    lines
        .iter()
        .map(CartLine::line_total)
        .try_fold(Price::ZERO, |sum, line| sum.checked_add(line?))
        .map(Price::round_cents)
}
