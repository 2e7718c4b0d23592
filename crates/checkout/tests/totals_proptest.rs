//! Property tests for order totals.
//!
//! For any non-empty set of lines the subtotal is the exact sum rounded once
//! to cents, the total is subtotal plus fee, and the cart preview agrees with
//! the builder. Amounts too large for a decimal are reported, never panic.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use proptest::test_runner::Config;
use rust_decimal::{Decimal, RoundingStrategy};
use shopdesk_checkout::{Cart, CartLine, OrderBuilder, OrderError};
use shopdesk_core::{Price, ProductId};

/// Largest amount a `NUMERIC(10,2)` column holds, in cents.
const MAX_STORED_CENTS: i64 = 99_999_999_99;

/// Prices within the stored range, in cents or tenths of a cent.
fn stored_price() -> impl Strategy<Value = Price> {
    (0_i64..=MAX_STORED_CENTS, 2_u32..=3)
        .prop_map(|(mantissa, scale)| Price::new(Decimal::new(mantissa, scale)).unwrap())
}

/// Any non-negative decimal, up to `Decimal::MAX`.
fn any_price() -> impl Strategy<Value = Price> {
    (any::<u32>(), any::<u32>(), any::<u32>(), 0_u32..=28).prop_map(|(lo, mid, hi, scale)| {
        Price::new(Decimal::from_parts(lo, mid, hi, false, scale)).unwrap()
    })
}

/// Lines with distinct products so the cart keeps every line as given.
fn lines_of(price: impl Strategy<Value = Price>) -> impl Strategy<Value = Vec<CartLine>> {
    prop::collection::vec((price, 1_u32..=10_000), 1..20).prop_map(|pairs| {
        pairs
            .into_iter()
            .zip(1_i32..)
            .map(|((unit_price, quantity), id)| CartLine::new(ProductId::new(id), unit_price, quantity))
            .collect()
    })
}

fn exact_subtotal(lines: &[CartLine]) -> Decimal {
    lines
        .iter()
        .map(|line| line.unit_price.amount() * Decimal::from(line.quantity))
        .sum::<Decimal>()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn totals_are_exact_for_stored_prices(
        lines in lines_of(stored_price()),
        fee_cents in 0_u32..=100_000,
    ) {
        let builder = OrderBuilder::new(Price::from_cents(fee_cents));
        let totals = builder.totals(&lines).unwrap();

        prop_assert_eq!(totals.subtotal.amount(), exact_subtotal(&lines));
        prop_assert_eq!(totals.shipping_fee, builder.shipping_fee());
        prop_assert_eq!(
            Some(totals.total),
            totals.subtotal.checked_add(totals.shipping_fee)
        );
        prop_assert_eq!(totals.total.round_cents(), totals.total);

        let cart = Cart::from_lines(lines).unwrap();
        prop_assert_eq!(cart.subtotal(), Some(totals.subtotal));
    }

    #[test]
    fn huge_amounts_are_reported_not_fatal(
        lines in lines_of(any_price()),
        fee_cents in 0_u32..=100_000,
    ) {
        let builder = OrderBuilder::new(Price::from_cents(fee_cents));
        let result = builder.totals(&lines);
        let cart = Cart::from_lines(lines).unwrap();

        match result {
            Ok(totals) => {
                prop_assert_eq!(
                    Some(totals.total),
                    totals.subtotal.checked_add(totals.shipping_fee)
                );
                prop_assert_eq!(cart.subtotal(), Some(totals.subtotal));
            }
            Err(err) => {
                prop_assert!(matches!(err, OrderError::AmountTooLarge), "unexpected {err:?}");
            }
        }
    }
}
