//! Shipping step: the editable customer form and its validated form.

use serde::{Deserialize, Serialize};
use shopdesk_core::Email;

use crate::validation::{Field, FieldError, ValidationErrors, max_chars, required};

/// Maximum length of a customer name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of a phone number.
pub const MAX_PHONE_LENGTH: usize = 20;

/// Raw input of the shipping step, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl ShippingForm {
    /// Validate every field and produce [`CustomerDetails`].
    ///
    /// All fields are checked; the error lists each offending one.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` naming every invalid field.
    pub fn validate(&self) -> Result<CustomerDetails, ValidationErrors> {
        let name = required(Field::CustomerName, "Name", &self.name)
            .and_then(|name| max_chars(Field::CustomerName, "Name", name, MAX_NAME_LENGTH));
        let email = Email::parse(&self.email)
            .map_err(|e| FieldError::new(Field::CustomerEmail, capitalize(&e.to_string())));
        let phone = parse_phone(&self.phone);
        let address = required(Field::ShippingAddress, "Shipping address", &self.address);

        match (name, email, phone, address) {
            (Ok(name), Ok(email), Ok(phone), Ok(address)) => Ok(CustomerDetails {
                name: name.to_owned(),
                email,
                phone,
                shipping_address: address.to_owned(),
            }),
            (name, email, phone, address) => Err(ValidationErrors::from_failures([
                name.err(),
                email.err(),
                phone.err(),
                address.err(),
            ])),
        }
    }
}

impl From<CustomerDetails> for ShippingForm {
    fn from(details: CustomerDetails) -> Self {
        Self {
            name: details.name,
            email: details.email.into_inner(),
            phone: details.phone.unwrap_or_default(),
            address: details.shipping_address,
        }
    }
}

/// Customer details that passed shipping-step validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub shipping_address: String,
}

/// Blank means "no phone"; otherwise length and character set are checked.
fn parse_phone(raw: &str) -> Result<Option<String>, FieldError> {
    let phone = raw.trim();
    if phone.is_empty() {
        return Ok(None);
    }
    max_chars(Field::CustomerPhone, "Phone", phone, MAX_PHONE_LENGTH)?;

    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-' | '.' | ' ');
    if phone.chars().all(allowed) && phone.chars().any(|c| c.is_ascii_digit()) {
        Ok(Some(phone.to_owned()))
    } else {
        Err(FieldError::new(
            Field::CustomerPhone,
            "Phone may only contain digits, spaces and + ( ) - .",
        ))
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
