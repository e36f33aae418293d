//! Local validation of customer form input.
//!
//! Validation is synchronous and runs before any request is sent. It checks
//! every field and reports all problems at once, so a form can show them
//! inline next to their inputs.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::form::{Attachment, Field, FormState};
use crate::types::{Customer, CustomerCategory, Email, EmailError, Title};

/// Minimum length of first and last names.
pub const MIN_NAME_LENGTH: usize = 2;
/// Maximum length of first and last names.
pub const MAX_NAME_LENGTH: usize = 50;
/// Minimum length of the first address line.
pub const MIN_ADDRESS_LENGTH: usize = 5;
/// Maximum length of an address line.
pub const MAX_ADDRESS_LENGTH: usize = 255;
/// Maximum length of a city name.
pub const MAX_CITY_LENGTH: usize = 100;
/// Maximum length of a company name.
pub const MAX_COMPANY_LENGTH: usize = 100;
/// Digit count range of mobile and phone numbers.
pub const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 10..=15;
/// Decimal places the server stores for a credit limit.
pub const CREDIT_LIMIT_SCALE: u32 = 2;
/// Total digits the server stores for a credit limit.
pub const CREDIT_LIMIT_DIGITS: u32 = 10;

/// Why a single field was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("is required")]
    Required,
    #[error("must be at least {min} characters")]
    TooShort { min: usize },
    #[error("must be at most {max} characters")]
    TooLong { max: usize },
    #[error("must be one of {expected}")]
    UnknownChoice { expected: &'static str },
    #[error("{0}")]
    Email(EmailError),
    #[error("must contain 10 to 15 digits")]
    InvalidPhone,
    #[error("must be a number")]
    NotANumber,
    #[error("must be a whole number")]
    NotAnInteger,
    #[error("cannot be negative")]
    Negative,
    #[error("must have at most {scale} decimal places")]
    TooPrecise { scale: u32 },
    #[error("must have at most {digits} digits")]
    TooLarge { digits: u32 },
    #[error("must be an uploaded file")]
    NotAFile,
    #[error("is not one of the available cities")]
    CityNotAllowed,
}

/// A rejected field together with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub error: ValidationError,
}

/// Every problem found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: Field, error: ValidationError) {
        self.errors.push(FieldError { field, error });
    }

    /// Whether no error was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// All recorded errors, in field order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// The error recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&ValidationError> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| &e.error)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, FieldError { field, error }) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field} {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Cities a customer may be assigned to.
///
/// Derived from the cities already present in the customer collection, in
/// first-seen order, without case-insensitive duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedCities(Vec<String>);

impl AllowedCities {
    /// Distinct cities of `customers`.
    #[must_use]
    pub fn from_customers<'a>(customers: impl IntoIterator<Item = &'a Customer>) -> Self {
        let mut cities: Vec<String> = Vec::new();
        for customer in customers {
            let city = customer.city.trim();
            if !city.is_empty() && !cities.iter().any(|c| same_city(c, city)) {
                cities.push(city.to_owned());
            }
        }
        Self(cities)
    }

    /// The canonical spelling of `city`, if it is allowed.
    #[must_use]
    pub fn canonical(&self, city: &str) -> Option<&str> {
        let city = city.trim();
        self.0
            .iter()
            .find(|c| same_city(c, city))
            .map(String::as_str)
    }

    /// Whether there are no cities to choose from.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The allowed cities.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for AllowedCities {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut cities: Vec<String> = Vec::new();
        for city in iter {
            let city = city.into();
            if !cities.iter().any(|c| same_city(c, &city)) {
                cities.push(city);
            }
        }
        Self(cities)
    }
}

/// Case-insensitive city comparison, Unicode-aware.
fn same_city(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// A validated customer value set, ready to send.
///
/// Serializes to the JSON body of create and full-replace update requests.
/// The photo is never part of the JSON body; a draft with a photo is sent as
/// multipart instead (see [`CustomerDraft::text_fields`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDraft {
    pub title: Title,
    pub customer_category: CustomerCategory,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub address_1: String,
    pub address_2: Option<String>,
    pub city: String,
    pub mobile: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub credit_limit: Decimal,
    pub credit_period: u32,
    #[serde(skip)]
    pub photo: Option<Attachment>,
}

impl CustomerDraft {
    /// Field name/value pairs for a multipart body. Unset optional fields are
    /// omitted.
    #[must_use]
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            (Field::Title.as_str(), self.title.as_str().to_owned()),
            (
                Field::CustomerCategory.as_str(),
                self.customer_category.as_str().to_owned(),
            ),
            (Field::FirstName.as_str(), self.first_name.clone()),
            (Field::LastName.as_str(), self.last_name.clone()),
            (Field::Email.as_str(), self.email.as_str().to_owned()),
            (Field::Address1.as_str(), self.address_1.clone()),
            (Field::City.as_str(), self.city.clone()),
            (Field::Mobile.as_str(), self.mobile.clone()),
            (Field::CreditLimit.as_str(), self.credit_limit.to_string()),
            (Field::CreditPeriod.as_str(), self.credit_period.to_string()),
        ];
        for (field, value) in [
            (Field::Address2, &self.address_2),
            (Field::Phone, &self.phone),
            (Field::CompanyName, &self.company_name),
        ] {
            if let Some(value) = value {
                fields.push((field.as_str(), value.clone()));
            }
        }
        fields
    }
}

/// Validate `state` against the field rules and the allowed city set.
///
/// # Errors
///
/// Returns every field error found; the draft is produced only when there
/// are none.
pub fn validate(state: &FormState, cities: &AllowedCities) -> Result<CustomerDraft, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = choice::<Title>(state, Field::Title, "Mr, Mrs, Ms, Dr", &mut errors);
    let customer_category = choice::<CustomerCategory>(
        state,
        Field::CustomerCategory,
        "Domestic, International",
        &mut errors,
    );
    let first_name = required_text(state, Field::FirstName, MIN_NAME_LENGTH, MAX_NAME_LENGTH, &mut errors);
    let last_name = required_text(state, Field::LastName, MIN_NAME_LENGTH, MAX_NAME_LENGTH, &mut errors);
    let email = required(state, Field::Email, &mut errors).and_then(|text| {
        Email::parse(&text)
            .map_err(|e| errors.push(Field::Email, ValidationError::Email(e)))
            .ok()
    });
    let address_1 = required_text(
        state,
        Field::Address1,
        MIN_ADDRESS_LENGTH,
        MAX_ADDRESS_LENGTH,
        &mut errors,
    );
    let address_2 = optional_text(state, Field::Address2, MAX_ADDRESS_LENGTH, &mut errors);
    let city = required(state, Field::City, &mut errors).and_then(|text| {
        if text.chars().count() > MAX_CITY_LENGTH {
            errors.push(Field::City, ValidationError::TooLong { max: MAX_CITY_LENGTH });
            return None;
        }
        match cities.canonical(&text) {
            Some(canonical) => Some(canonical.to_owned()),
            None => {
                errors.push(Field::City, ValidationError::CityNotAllowed);
                None
            }
        }
    });
    let mobile = required(state, Field::Mobile, &mut errors)
        .and_then(|text| phone_number(&text, Field::Mobile, &mut errors));
    let phone = state
        .text(Field::Phone)
        .and_then(|text| phone_number(&text, Field::Phone, &mut errors));
    let company_name = optional_text(state, Field::CompanyName, MAX_COMPANY_LENGTH, &mut errors);
    let credit_limit = required(state, Field::CreditLimit, &mut errors)
        .and_then(|text| credit_limit(&text, &mut errors));
    let credit_period = required(state, Field::CreditPeriod, &mut errors)
        .and_then(|text| credit_period(&text, &mut errors));
    let photo = match state.get(Field::Photo) {
        None => None,
        Some(_) => match state.file(Field::Photo) {
            Some(attachment) => Some(attachment.clone()),
            None => {
                errors.push(Field::Photo, ValidationError::NotAFile);
                None
            }
        },
    };

    match (
        title,
        customer_category,
        first_name,
        last_name,
        email,
        address_1,
        city,
        mobile,
        credit_limit,
        credit_period,
    ) {
        (
            Some(title),
            Some(customer_category),
            Some(first_name),
            Some(last_name),
            Some(email),
            Some(address_1),
            Some(city),
            Some(mobile),
            Some(credit_limit),
            Some(credit_period),
        ) if errors.is_empty() => Ok(CustomerDraft {
            title,
            customer_category,
            first_name,
            last_name,
            email,
            address_1,
            address_2,
            city,
            mobile,
            phone,
            company_name,
            credit_limit,
            credit_period,
            photo,
        }),
        _ => Err(errors),
    }
}

fn required(state: &FormState, field: Field, errors: &mut ValidationErrors) -> Option<String> {
    let text = state.text(field).map(std::borrow::Cow::into_owned);
    if text.is_none() {
        errors.push(field, ValidationError::Required);
    }
    text
}

fn required_text(
    state: &FormState,
    field: Field,
    min: usize,
    max: usize,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let text = required(state, field, errors)?;
    let len = text.chars().count();
    if len < min {
        errors.push(field, ValidationError::TooShort { min });
        return None;
    }
    if len > max {
        errors.push(field, ValidationError::TooLong { max });
        return None;
    }
    Some(text)
}

fn optional_text(
    state: &FormState,
    field: Field,
    max: usize,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let text = state.text(field)?;
    if text.chars().count() > max {
        errors.push(field, ValidationError::TooLong { max });
        return None;
    }
    Some(text.into_owned())
}

fn choice<T: FromStr>(
    state: &FormState,
    field: Field,
    expected: &'static str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    let text = required(state, field, errors)?;
    text.parse()
        .map_err(|_| errors.push(field, ValidationError::UnknownChoice { expected }))
        .ok()
}

/// 10 to 15 digits with an optional leading `+`.
fn phone_number(text: &str, field: Field, errors: &mut ValidationErrors) -> Option<String> {
    let digits = text.strip_prefix('+').unwrap_or(text);
    if digits.chars().all(|c| c.is_ascii_digit()) && PHONE_DIGITS.contains(&digits.len()) {
        Some(text.to_owned())
    } else {
        errors.push(field, ValidationError::InvalidPhone);
        None
    }
}

fn credit_limit(text: &str, errors: &mut ValidationErrors) -> Option<Decimal> {
    let Ok(value) = Decimal::from_str(text) else {
        errors.push(Field::CreditLimit, ValidationError::NotANumber);
        return None;
    };
    if value.is_sign_negative() && !value.is_zero() {
        errors.push(Field::CreditLimit, ValidationError::Negative);
        return None;
    }
    if value.normalize().scale() > CREDIT_LIMIT_SCALE {
        errors.push(
            Field::CreditLimit,
            ValidationError::TooPrecise {
                scale: CREDIT_LIMIT_SCALE,
            },
        );
        return None;
    }
    let bound = Decimal::from(10_i64.pow(CREDIT_LIMIT_DIGITS - CREDIT_LIMIT_SCALE));
    if value >= bound {
        errors.push(
            Field::CreditLimit,
            ValidationError::TooLarge {
                digits: CREDIT_LIMIT_DIGITS,
            },
        );
        return None;
    }
    // Trailing zeros past two places are dropped; "-0" becomes "0".
    Some(value.abs().round_dp(CREDIT_LIMIT_SCALE))
}

fn credit_period(text: &str, errors: &mut ValidationErrors) -> Option<u32> {
    let Ok(value) = Decimal::from_str(text) else {
        errors.push(Field::CreditPeriod, ValidationError::NotANumber);
        return None;
    };
    if !value.fract().is_zero() {
        errors.push(Field::CreditPeriod, ValidationError::NotAnInteger);
        return None;
    }
    if value.is_sign_negative() && !value.is_zero() {
        errors.push(Field::CreditPeriod, ValidationError::Negative);
        return None;
    }
    let days = value.abs().to_u32();
    if days.is_none() {
        errors.push(Field::CreditPeriod, ValidationError::TooLarge { digits: 10 });
    }
    days
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::form::FieldValue;

    fn cities() -> AllowedCities {
        ["Colombo", "Kandy"].into_iter().collect()
    }

    fn valid_state() -> FormState {
        let mut state = FormState::new();
        state.set_text(Field::Title, "Ms");
        state.set_text(Field::CustomerCategory, "Domestic");
        state.set_text(Field::FirstName, "Dilini");
        state.set_text(Field::LastName, "Fernando");
        state.set_text(Field::Email, "dilini@example.lk");
        state.set_text(Field::Address1, "45 Lake Drive");
        state.set_text(Field::City, "kandy");
        state.set_text(Field::Mobile, "+94771234567");
        state.set_text(Field::CreditLimit, "1500.50");
        state.set_text(Field::CreditPeriod, "45");
        state
    }

    #[test]
    fn test_valid_form_produces_draft() {
        let draft = validate(&valid_state(), &cities()).unwrap();
        assert_eq!(draft.title, Title::Ms);
        assert_eq!(draft.city, "Kandy");
        assert_eq!(draft.credit_limit, Decimal::new(150_050, 2));
        assert_eq!(draft.credit_period, 45);
        assert_eq!(draft.phone, None);
        assert_eq!(draft.photo, None);
    }

    #[test]
    fn test_empty_form_reports_every_required_field() {
        let errors = validate(&FormState::new(), &cities()).unwrap_err();
        for field in [
            Field::Title,
            Field::CustomerCategory,
            Field::FirstName,
            Field::LastName,
            Field::Email,
            Field::Address1,
            Field::City,
            Field::Mobile,
            Field::CreditLimit,
            Field::CreditPeriod,
        ] {
            assert_eq!(errors.get(field), Some(&ValidationError::Required), "{field}");
        }
        assert_eq!(errors.get(Field::Phone), None);
    }

    #[test]
    fn test_city_outside_allowed_set_is_rejected() {
        let mut state = valid_state();
        state.set_text(Field::City, "Jaffna");
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(errors.get(Field::City), Some(&ValidationError::CityNotAllowed));
    }

    #[test]
    fn test_length_rules() {
        let mut state = valid_state();
        state.set_text(Field::FirstName, "D");
        state.set_text(Field::Address1, "12 A");
        state.set_text(Field::LastName, "x".repeat(51));
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(errors.get(Field::FirstName), Some(&ValidationError::TooShort { min: 2 }));
        assert_eq!(errors.get(Field::Address1), Some(&ValidationError::TooShort { min: 5 }));
        assert_eq!(errors.get(Field::LastName), Some(&ValidationError::TooLong { max: 50 }));
    }

    #[test]
    fn test_phone_rules() {
        let mut state = valid_state();
        state.set_text(Field::Mobile, "077123");
        state.set_text(Field::Phone, "0112-345678");
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(errors.get(Field::Mobile), Some(&ValidationError::InvalidPhone));
        assert_eq!(errors.get(Field::Phone), Some(&ValidationError::InvalidPhone));

        state.set_text(Field::Mobile, "1234567890123456");
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(errors.get(Field::Mobile), Some(&ValidationError::InvalidPhone));
    }

    #[test]
    fn test_credit_rules() {
        let mut state = valid_state();
        state.set_text(Field::CreditLimit, "-1");
        state.set_text(Field::CreditPeriod, "2.5");
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(errors.get(Field::CreditLimit), Some(&ValidationError::Negative));
        assert_eq!(errors.get(Field::CreditPeriod), Some(&ValidationError::NotAnInteger));

        state.set_text(Field::CreditLimit, "10.001");
        state.set_text(Field::CreditPeriod, "-3");
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(
            errors.get(Field::CreditLimit),
            Some(&ValidationError::TooPrecise { scale: 2 })
        );
        assert_eq!(errors.get(Field::CreditPeriod), Some(&ValidationError::Negative));

        state.set_text(Field::CreditLimit, "abc");
        state.set(Field::CreditPeriod, FieldValue::Number(Decimal::from(0)));
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(errors.get(Field::CreditLimit), Some(&ValidationError::NotANumber));
        assert_eq!(errors.get(Field::CreditPeriod), None);
    }

    #[test]
    fn test_zero_credit_is_allowed() {
        let mut state = valid_state();
        state.set_text(Field::CreditLimit, "0");
        state.set_text(Field::CreditPeriod, "0");
        let draft = validate(&state, &cities()).unwrap();
        assert!(draft.credit_limit.is_zero());
        assert_eq!(draft.credit_period, 0);
    }

    #[test]
    fn test_credit_limit_upper_bound() {
        let mut state = valid_state();
        state.set_text(Field::CreditLimit, "99999999.99");
        assert!(validate(&state, &cities()).is_ok());
        state.set_text(Field::CreditLimit, "100000000");
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(
            errors.get(Field::CreditLimit),
            Some(&ValidationError::TooLarge { digits: 10 })
        );
    }

    #[test]
    fn test_photo_must_be_a_file() {
        let mut state = valid_state();
        state.set_text(Field::Photo, "not-a-file.png");
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(errors.get(Field::Photo), Some(&ValidationError::NotAFile));
    }

    #[test]
    fn test_allowed_cities_from_customers_dedupes() {
        let cities: AllowedCities = ["Colombo", "colombo", "Galle"].into_iter().collect();
        assert_eq!(cities.as_slice(), ["Colombo", "Galle"]);
        assert_eq!(cities.canonical(" GALLE "), Some("Galle"));
        assert!(AllowedCities::default().is_empty());
    }

    #[test]
    fn test_allowed_cities_fold_non_ascii_case() {
        let cities: AllowedCities = ["Ümeå", "ümeå", "ÜMEÅ", "Kandy"].into_iter().collect();
        assert_eq!(cities.as_slice(), ["Ümeå", "Kandy"]);
        assert_eq!(cities.canonical("ümeå"), Some("Ümeå"));
        assert_eq!(cities.canonical(" ÜMEÅ "), Some("Ümeå"));
        assert_eq!(cities.canonical("Umea"), None);
    }

    #[test]
    fn test_draft_json_and_multipart_fields() {
        let mut state = valid_state();
        state.set_text(Field::CompanyName, "Lake Traders");
        let draft = validate(&state, &cities()).unwrap();

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["credit_limit"], "1500.50");
        assert_eq!(json["credit_period"], 45);
        assert!(json.get("photo").is_none());

        let fields = draft.text_fields();
        assert!(fields.contains(&("company_name", "Lake Traders".to_owned())));
        assert!(!fields.iter().any(|(name, _)| *name == "phone"));
    }

    #[test]
    fn test_errors_display_lists_fields() {
        let mut state = valid_state();
        state.remove(Field::Email);
        let errors = validate(&state, &cities()).unwrap_err();
        assert_eq!(errors.to_string(), "email is required");
    }
}
