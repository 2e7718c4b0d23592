//! Payment step.
//!
//! Card details are format-checked only. No charge is made and nothing here
//! is ever persisted; once validated the card number and CVC live in
//! [`SecretString`]s so they cannot leak through `Debug` or logs.

use core::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::validation::{Field, FieldError, ValidationErrors, required};

/// Raw input of the payment step.
#[derive(Clone, Default)]
pub struct PaymentForm {
    pub card_number: String,
    pub card_expiry: String,
    pub card_cvc: String,
}

impl fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentForm")
            .field("card_number", &"[REDACTED]")
            .field("card_expiry", &self.card_expiry)
            .field("card_cvc", &"[REDACTED]")
            .finish()
    }
}

impl PaymentForm {
    /// Validate the card fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` naming every invalid card field.
    pub fn validate(&self) -> Result<PaymentDetails, ValidationErrors> {
        let number = parse_card_number(&self.card_number);
        let expiry = parse_expiry(&self.card_expiry);
        let cvc = parse_cvc(&self.card_cvc);

        match (number, expiry, cvc) {
            (Ok(number), Ok(expiry), Ok(cvc)) => Ok(PaymentDetails {
                card_number: SecretString::from(number),
                expiry,
                cvc: SecretString::from(cvc),
            }),
            (number, expiry, cvc) => Err(ValidationErrors::from_failures([
                number.err(),
                expiry.err(),
                cvc.err(),
            ])),
        }
    }
}

/// Card expiry as entered; never compared against the current date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardExpiry {
    pub month: u8,
    /// Four-digit year (`MM/YY` input is read as 20YY).
    pub year: u16,
}

impl fmt::Display for CardExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.year % 100)
    }
}

/// Card details that passed payment-step validation.
pub struct PaymentDetails {
    card_number: SecretString,
    expiry: CardExpiry,
    cvc: SecretString,
}

impl PaymentDetails {
    /// Last four digits of the card, safe to display.
    #[must_use]
    pub fn last_four(&self) -> &str {
        let digits = self.card_number.expose_secret();
        digits.get(digits.len().saturating_sub(4)..).unwrap_or(digits)
    }

    #[must_use]
    pub const fn expiry(&self) -> CardExpiry {
        self.expiry
    }

    #[must_use]
    pub fn cvc(&self) -> &SecretString {
        &self.cvc
    }
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("card", &format_args!("**** {}", self.last_four()))
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Digits of the card number with space and dash separators removed.
fn parse_card_number(raw: &str) -> Result<String, FieldError> {
    let raw = required(Field::CardNumber, "Card number", raw)?;
    let digits: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if digits.len() < 12 || digits.len() > 19 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::new(
            Field::CardNumber,
            "Card number must be 12 to 19 digits",
        ));
    }
    Ok(digits)
}

/// `MM/YY` or `MM/YYYY`.
fn parse_expiry(raw: &str) -> Result<CardExpiry, FieldError> {
    let raw = required(Field::CardExpiry, "Expiry", raw)?;
    let invalid = || FieldError::new(Field::CardExpiry, "Expiry must be MM/YY");

    let (month, year) = raw.split_once('/').ok_or_else(invalid)?;
    let (month, year) = (month.trim(), year.trim());
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if month.len() != 2 || !all_digits(month) || !matches!(year.len(), 2 | 4) || !all_digits(year) {
        return Err(invalid());
    }

    let month: u8 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(FieldError::new(
            Field::CardExpiry,
            "Expiry month must be between 01 and 12",
        ));
    }
    let mut year: u16 = year.parse().map_err(|_| invalid())?;
    if year < 100 {
        year += 2000;
    }
    Ok(CardExpiry { month, year })
}

fn parse_cvc(raw: &str) -> Result<String, FieldError> {
    let cvc = required(Field::CardCvc, "CVC", raw)?;
    if matches!(cvc.len(), 3 | 4) && cvc.chars().all(|c| c.is_ascii_digit()) {
        Ok(cvc.to_owned())
    } else {
        Err(FieldError::new(Field::CardCvc, "CVC must be 3 or 4 digits"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(number: &str, expiry: &str, cvc: &str) -> PaymentForm {
        PaymentForm {
            card_number: number.to_owned(),
            card_expiry: expiry.to_owned(),
            card_cvc: cvc.to_owned(),
        }
    }

    #[test]
    fn test_valid_card() {
        let details = form("4242 4242 4242 4242", "12/29", "123").validate().unwrap();
        assert_eq!(details.last_four(), "4242");
        assert_eq!(details.expiry(), CardExpiry { month: 12, year: 2029 });
        assert_eq!(details.cvc().expose_secret(), "123");
    }

    #[test]
    fn test_accepts_dashes_and_long_year() {
        let details = form("5555-5555-5555-4444", "01/2031", "1234").validate().unwrap();
        assert_eq!(details.expiry().to_string(), "01/31");
    }

    #[test]
    fn test_blank_fields_are_required() {
        let err = PaymentForm::default().validate().unwrap_err();
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            vec![Field::CardNumber, Field::CardExpiry, Field::CardCvc]
        );
        assert_eq!(err.errors()[0].message, "Card number is required");
    }

    #[test]
    fn test_rejects_bad_formats() {
        assert!(form("4242", "12/29", "123").validate().unwrap_err().contains(Field::CardNumber));
        assert!(
            form("4242 4242 4242 424x", "12/29", "123")
                .validate()
                .unwrap_err()
                .contains(Field::CardNumber)
        );
        assert!(form("4242424242424242", "13/29", "123").validate().unwrap_err().contains(Field::CardExpiry));
        assert!(form("4242424242424242", "1229", "123").validate().unwrap_err().contains(Field::CardExpiry));
        assert!(form("4242424242424242", "12/29", "12").validate().unwrap_err().contains(Field::CardCvc));
    }

    #[test]
    fn test_debug_redacts_card_data() {
        let raw = form("4242424242424242", "12/29", "987");
        let debug = format!("{raw:?}");
        assert!(!debug.contains("4242424242424242"));
        assert!(!debug.contains("987"));

        let details = raw.validate().unwrap();
        let debug = format!("{details:?}");
        assert!(debug.contains("**** 4242"));
        assert!(!debug.contains("4242424242424242"));
        assert!(!debug.contains("987"));
    }
}
