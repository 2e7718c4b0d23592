//! Type-safe price representation using decimal arithmetic.
//!
//! Every monetary amount in Shopdesk is a non-negative [`Decimal`] in the
//! store's single currency. Arithmetic is exact and checked: an amount that
//! would overflow [`Decimal`] yields `None` instead of panicking. Rounding to
//! cents happens only where a caller asks for it with [`Price::round_cents`].

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The input is not a decimal number.
    #[error("invalid price {input:?}: {reason}")]
    Invalid {
        /// The rejected input.
        input: String,
        /// Why the decimal parser rejected it.
        reason: String,
    },
}

/// A non-negative monetary amount.
///
/// Serializes as a decimal string (`"99.99"`) so no precision is lost in JSON.
///
/// ```
/// use shopdesk_core::Price;
///
/// let unit: Price = "99.99".parse().unwrap();
/// let fee: Price = "15.00".parse().unwrap();
/// assert_eq!(unit.checked_add(fee).unwrap().to_string(), "114.99");
/// assert!("-1".parse::<Price>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Number of decimal places amounts are rounded to.
    pub const CENT_SCALE: u32 = 2;

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), Self::CENT_SCALE))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Round to whole cents, halves away from zero.
    #[must_use]
    pub fn round_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(Self::CENT_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Multiply by a quantity without rounding. `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Add two amounts. `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Sum amounts exactly. `None` if any partial sum overflows.
    #[must_use]
    pub fn checked_sum<I: IntoIterator<Item = Self>>(prices: I) -> Option<Self> {
        prices
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|e| PriceError::Invalid {
            input: s.to_owned(),
            reason: e.to_string(),
        })?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_accepts_zero() {
        assert!(Price::new(Decimal::ZERO).unwrap().is_zero());
        assert!(price("-0").is_zero());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            "abc".parse::<Price>(),
            Err(PriceError::Invalid { .. })
        ));
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(1500), price("15.00"));
        assert_eq!(Price::from_cents(9999).to_string(), "99.99");
    }

    #[test]
    fn test_decimal_sum_has_no_drift() {
        // 0.1 + 0.2 is exact in decimal arithmetic
        let total = Price::checked_sum([price("0.1"), price("0.2")]).unwrap();
        assert_eq!(total, price("0.3"));
    }

    #[test]
    fn test_times_keeps_full_precision() {
        assert_eq!(price("0.333").checked_times(3), Some(price("0.999")));
    }

    #[test]
    fn test_overflow_is_none() {
        let max = Price::new(Decimal::MAX).unwrap();
        assert_eq!(max.checked_times(2), None);
        assert_eq!(max.checked_add(price("1")), None);
        assert_eq!(Price::checked_sum([max, max]), None);
        assert_eq!(max.checked_times(1), Some(max));
    }

    #[test]
    fn test_round_cents_half_away_from_zero() {
        assert_eq!(price("0.125").round_cents(), price("0.13"));
        assert_eq!(price("0.124").round_cents(), price("0.12"));
        assert_eq!(price("2.5").round_cents(), price("2.50"));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&price("99.99")).unwrap();
        assert_eq!(json, "\"99.99\"");

        let parsed: Price = serde_json::from_str("\"15.00\"").unwrap();
        assert_eq!(parsed, price("15"));

        assert!(serde_json::from_str::<Price>("\"-5\"").is_err());
    }
}
