//! Customer record and its choice fields.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::email::Email;
use super::id::CustomerId;

/// Error returned when a string is not one of a choice field's values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {value:?} (expected one of {expected})")]
pub struct ParseChoiceError {
    /// Name of the choice field.
    pub field: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma-separated list of accepted values.
    pub expected: &'static str,
}

/// Customer salutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Title {
    Mr,
    Mrs,
    Ms,
    Dr,
}

impl Title {
    /// All titles, in the order forms list them.
    pub const ALL: [Self; 4] = [Self::Mr, Self::Mrs, Self::Ms, Self::Dr];

    /// Wire value of the title.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mr => "Mr",
            Self::Mrs => "Mrs",
            Self::Ms => "Ms",
            Self::Dr => "Dr",
        }
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Title {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|title| title.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseChoiceError {
                field: "title",
                value: s.to_owned(),
                expected: "Mr, Mrs, Ms, Dr",
            })
    }
}

/// Whether a customer is served domestically or abroad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerCategory {
    Domestic,
    International,
}

impl CustomerCategory {
    /// All categories, in the order forms list them.
    pub const ALL: [Self; 2] = [Self::Domestic, Self::International];

    /// Wire value of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Domestic => "Domestic",
            Self::International => "International",
        }
    }
}

impl fmt::Display for CustomerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CustomerCategory {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseChoiceError {
                field: "customer category",
                value: s.to_owned(),
                expected: "Domestic, International",
            })
    }
}

/// A customer as returned by the customer API.
///
/// The `id` is always server-assigned. `photo` holds the URL the server
/// exposes for an uploaded image; uploads go through
/// [`CustomerDraft`](crate::CustomerDraft) instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub title: Title,
    pub customer_category: CustomerCategory,
    pub first_name: String,
    pub last_name: String,
    /// Taken as the server sent it; not re-checked with [`Email::parse`].
    pub email: Email,
    pub address_1: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub address_2: Option<String>,
    pub city: String,
    pub mobile: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub company_name: Option<String>,
    pub credit_limit: Decimal,
    /// Credit period in days.
    pub credit_period: i32,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub photo: Option<String>,
}

impl Customer {
    /// First and last name separated by a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Blank optional strings come back as `""` or `null` depending on how the
/// record was written; both mean "not set".
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": 3,
            "title": "Dr",
            "customer_category": "International",
            "first_name": "Nimal",
            "last_name": "Perera",
            "email": "nimal@example.lk",
            "address_1": "12 Temple Road",
            "address_2": "",
            "city": "Kandy",
            "mobile": "0771234567",
            "phone": null,
            "company_name": "Perera Traders",
            "photo": null,
            "credit_limit": "2500.50",
            "credit_period": 30,
            "is_deleted": false
        })
    }

    #[test]
    fn test_deserialize_server_record() {
        let customer: Customer = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(customer.id, CustomerId::new(3));
        assert_eq!(customer.title, Title::Dr);
        assert_eq!(customer.customer_category, CustomerCategory::International);
        assert_eq!(customer.address_2, None);
        assert_eq!(customer.phone, None);
        assert_eq!(customer.company_name.as_deref(), Some("Perera Traders"));
        assert_eq!(customer.credit_limit, Decimal::new(250_050, 2));
        assert_eq!(customer.full_name(), "Nimal Perera");
    }

    #[test]
    fn test_deserialize_numeric_credit_limit() {
        let mut json = sample_json();
        json["credit_limit"] = serde_json::json!(9);
        let customer: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(customer.credit_limit, Decimal::from(9));
    }

    #[test]
    fn test_server_email_is_not_revalidated() {
        let mut json = sample_json();
        json["email"] = serde_json::json!("admin@localhost");
        let customer: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(customer.email.as_str(), "admin@localhost");
        assert!(Email::parse("admin@localhost").is_err());
    }

    #[test]
    fn test_title_from_str_is_case_insensitive() {
        assert_eq!("mrs".parse::<Title>().unwrap(), Title::Mrs);
        assert_eq!(" DR ".parse::<Title>().unwrap(), Title::Dr);
        let err = "Sir".parse::<Title>().unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn test_category_round_trips_through_display() {
        for category in CustomerCategory::ALL {
            assert_eq!(
                category.to_string().parse::<CustomerCategory>().unwrap(),
                category
            );
        }
    }
}
