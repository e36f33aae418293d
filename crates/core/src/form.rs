//! Transient create/edit form state.
//!
//! A [`FormState`] lives only while a form is open. It stores whatever the
//! user typed, keyed by [`Field`], and is turned into a typed
//! [`CustomerDraft`](crate::CustomerDraft) by [`crate::validation::validate`].

use std::borrow::Cow;
use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::types::Customer;

/// A field of the customer form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title,
    CustomerCategory,
    FirstName,
    LastName,
    Email,
    Address1,
    Address2,
    City,
    Mobile,
    Phone,
    CompanyName,
    CreditLimit,
    CreditPeriod,
    Photo,
}

impl Field {
    /// Every form field, in display order.
    pub const ALL: [Self; 14] = [
        Self::Title,
        Self::CustomerCategory,
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Address1,
        Self::Address2,
        Self::City,
        Self::Mobile,
        Self::Phone,
        Self::CompanyName,
        Self::CreditLimit,
        Self::CreditPeriod,
        Self::Photo,
    ];

    /// Field name as used by the API and in server error payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::CustomerCategory => "customer_category",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Address1 => "address_1",
            Self::Address2 => "address_2",
            Self::City => "city",
            Self::Mobile => "mobile",
            Self::Phone => "phone",
            Self::CompanyName => "company_name",
            Self::CreditLimit => "credit_limit",
            Self::CreditPeriod => "credit_period",
            Self::Photo => "photo",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown field: {s}"))
    }
}

/// A file picked for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name sent with the multipart part.
    pub file_name: String,
    /// MIME type, e.g. `image/png`.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A raw value entered into a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    File(Attachment),
}

/// Field values of an open form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    values: BTreeMap<Field, FieldValue>,
}

impl FormState {
    /// An empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A form prefilled from an existing record, for editing.
    ///
    /// The stored photo is a server URL, not an upload, so it is left out:
    /// the server keeps it unless a new file is attached.
    #[must_use]
    pub fn from_customer(customer: &Customer) -> Self {
        let mut state = Self::new();
        state.set_text(Field::Title, customer.title.as_str());
        state.set_text(Field::CustomerCategory, customer.customer_category.as_str());
        state.set_text(Field::FirstName, &customer.first_name);
        state.set_text(Field::LastName, &customer.last_name);
        state.set_text(Field::Email, customer.email.as_str());
        state.set_text(Field::Address1, &customer.address_1);
        state.set_text(Field::City, &customer.city);
        state.set_text(Field::Mobile, &customer.mobile);
        state.set(Field::CreditLimit, FieldValue::Number(customer.credit_limit));
        state.set(
            Field::CreditPeriod,
            FieldValue::Number(Decimal::from(customer.credit_period)),
        );
        for (field, value) in [
            (Field::Address2, &customer.address_2),
            (Field::Phone, &customer.phone),
            (Field::CompanyName, &customer.company_name),
        ] {
            if let Some(value) = value {
                state.set_text(field, value);
            }
        }
        state
    }

    /// Set a field to any value, replacing what was there.
    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    /// Set a field to a text value.
    pub fn set_text(&mut self, field: Field, value: impl Into<String>) {
        self.set(field, FieldValue::Text(value.into()));
    }

    /// Attach a file to a field.
    pub fn set_file(&mut self, field: Field, attachment: Attachment) {
        self.set(field, FieldValue::File(attachment));
    }

    /// Clear a single field.
    pub fn remove(&mut self, field: Field) -> Option<FieldValue> {
        self.values.remove(&field)
    }

    /// Discard every value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Raw value of a field.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Trimmed text of a field; numbers are rendered, files and blank text
    /// count as unset.
    #[must_use]
    pub fn text(&self, field: Field) -> Option<Cow<'_, str>> {
        match self.values.get(&field)? {
            FieldValue::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(Cow::Borrowed(trimmed))
            }
            FieldValue::Number(number) => Some(Cow::Owned(number.to_string())),
            FieldValue::File(_) => None,
        }
    }

    /// Attachment stored in a field, if any.
    #[must_use]
    pub fn file(&self, field: Field) -> Option<&Attachment> {
        match self.values.get(&field)? {
            FieldValue::File(attachment) => Some(attachment),
            _ => None,
        }
    }

    /// Whether nothing has been entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_trims_and_blanks_are_unset() {
        let mut state = FormState::new();
        state.set_text(Field::FirstName, "  Amal ");
        state.set_text(Field::Phone, "   ");
        assert_eq!(state.text(Field::FirstName).as_deref(), Some("Amal"));
        assert_eq!(state.text(Field::Phone), None);
        assert_eq!(state.text(Field::City), None);
    }

    #[test]
    fn test_numbers_render_as_text() {
        let mut state = FormState::new();
        state.set(Field::CreditLimit, FieldValue::Number(Decimal::new(1050, 1)));
        assert_eq!(state.text(Field::CreditLimit).as_deref(), Some("105.0"));
    }

    #[test]
    fn test_file_is_not_text() {
        let mut state = FormState::new();
        state.set_file(
            Field::Photo,
            Attachment {
                file_name: "me.png".to_owned(),
                content_type: "image/png".to_owned(),
                bytes: vec![1, 2, 3],
            },
        );
        assert_eq!(state.text(Field::Photo), None);
        assert_eq!(state.file(Field::Photo).unwrap().file_name, "me.png");
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>().unwrap(), field);
        }
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut state = FormState::new();
        state.set_text(Field::City, "Galle");
        state.clear();
        assert!(state.is_empty());
    }
}
