//! Field-level validation errors shared by every checkout step.

use core::fmt;

use serde::Serialize;

/// A form field the checkout flow validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// The cart as a whole (e.g. it is empty).
    Cart,
    /// A cart line quantity.
    CartQuantity,
    CustomerName,
    CustomerEmail,
    CustomerPhone,
    ShippingAddress,
    CardNumber,
    CardExpiry,
    CardCvc,
    /// Form-level error not tied to one input (e.g. the order failed).
    Order,
}

impl Field {
    /// Stable name used in error payloads and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::CartQuantity => "cart.quantity",
            Self::CustomerName => "customer_name",
            Self::CustomerEmail => "customer_email",
            Self::CustomerPhone => "customer_phone",
            Self::ShippingAddress => "shipping_address",
            Self::CardNumber => "card_number",
            Self::CardExpiry => "card_expiry",
            Self::CardCvc => "card_cvc",
            Self::Order => "order",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rejected field and a message suitable for showing next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A non-empty set of field errors from validating one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Turn collected errors into a result; an empty list means valid.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` when `errors` is not empty.
    pub fn check(errors: Vec<FieldError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self { errors })
        }
    }

    /// The individual field errors, in the order the fields were checked.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Names of the offending fields.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.errors.iter().map(|e| e.field)
    }

    /// Returns true if `field` is among the offending fields.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.fields().any(|f| f == field)
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// Gather the failures of a step whose fields did not all validate.
    ///
    /// Callers only use this after matching at least one failure.
    pub(crate) fn from_failures(failures: impl IntoIterator<Item = Option<FieldError>>) -> Self {
        Self {
            errors: failures.into_iter().flatten().collect(),
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid fields: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", error.field)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Trimmed value of a required text input.
pub(crate) fn required<'a>(field: Field, label: &str, value: &'a str) -> Result<&'a str, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FieldError::new(field, format!("{label} is required")))
    } else {
        Ok(trimmed)
    }
}

/// Reject `value` when it is longer than `max` characters.
pub(crate) fn max_chars<'a>(
    field: Field,
    label: &str,
    value: &'a str,
    max: usize,
) -> Result<&'a str, FieldError> {
    if value.chars().count() > max {
        Err(FieldError::new(
            field,
            format!("{label} must be at most {max} characters"),
        ))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_empty_is_ok() {
        assert!(ValidationErrors::check(Vec::new()).is_ok());
    }

    #[test]
    fn test_display_lists_fields() {
        let err = ValidationErrors::check(vec![
            FieldError::new(Field::CustomerEmail, "bad"),
            FieldError::new(Field::ShippingAddress, "missing"),
        ])
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid fields: customer_email, shipping_address"
        );
        assert!(err.contains(Field::CustomerEmail));
        assert!(!err.contains(Field::CustomerName));
    }

    #[test]
    fn test_into_errors_keeps_order() {
        let err = ValidationErrors::check(vec![
            FieldError::new(Field::CardNumber, "bad number"),
            FieldError::new(Field::CardCvc, "bad cvc"),
        ])
        .unwrap_err();

        let errors = err.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, Field::CardNumber);
        assert_eq!(errors[1].message, "bad cvc");
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required(Field::CustomerName, "Name", "  Maria "), Ok("Maria"));
        let err = required(Field::CustomerName, "Name", "   ").unwrap_err();
        assert_eq!(err.message, "Name is required");
    }

    #[test]
    fn test_max_chars_counts_characters() {
        assert!(max_chars(Field::CustomerName, "Name", "Jo\u{e3}o", 4).is_ok());
        let err = max_chars(Field::CustomerName, "Name", "Jo\u{e3}o!", 4).unwrap_err();
        assert_eq!(err.message, "Name must be at most 4 characters");
    }

    #[test]
    fn test_field_serializes_snake_case() {
        let json = serde_json::to_string(&Field::CardCvc).unwrap();
        assert_eq!(json, "\"card_cvc\"");
    }
}
