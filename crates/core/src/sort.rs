//! Sorting and filtering for the customer table.
//!
//! A [`SortSpec`] is a pure value: toggling it never touches the customer
//! collection. [`SortedView`] borrows the collection and computes the display
//! order the first time it is iterated; every later iteration replays the
//! same order.

use std::cell::OnceCell;
use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Customer;

/// A displayed customer attribute the table can sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Title,
    CustomerCategory,
    FirstName,
    LastName,
    Email,
    City,
    Mobile,
    CompanyName,
    CreditLimit,
    CreditPeriod,
}

impl SortKey {
    /// Every sortable attribute.
    pub const ALL: [Self; 10] = [
        Self::Title,
        Self::CustomerCategory,
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::City,
        Self::Mobile,
        Self::CompanyName,
        Self::CreditLimit,
        Self::CreditPeriod,
    ];

    /// Parse a sort key from a field name or a column alias.
    #[must_use]
    pub fn from_str_param(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" => Some(Self::Title),
            "customer_category" | "category" => Some(Self::CustomerCategory),
            "first_name" | "name" => Some(Self::FirstName),
            "last_name" => Some(Self::LastName),
            "email" => Some(Self::Email),
            "city" => Some(Self::City),
            "mobile" => Some(Self::Mobile),
            "company_name" | "company" => Some(Self::CompanyName),
            "credit_limit" | "limit" => Some(Self::CreditLimit),
            "credit_period" | "period" => Some(Self::CreditPeriod),
            _ => None,
        }
    }

    /// Field name of the attribute on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::CustomerCategory => "customer_category",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::City => "city",
            Self::Mobile => "mobile",
            Self::CompanyName => "company_name",
            Self::CreditLimit => "credit_limit",
            Self::CreditPeriod => "credit_period",
        }
    }

    fn value(self, customer: &Customer) -> SortValue {
        match self {
            Self::Title => SortValue::text(customer.title.as_str()),
            Self::CustomerCategory => SortValue::text(customer.customer_category.as_str()),
            Self::FirstName => SortValue::text(&customer.first_name),
            Self::LastName => SortValue::text(&customer.last_name),
            Self::Email => SortValue::text(customer.email.as_str()),
            Self::City => SortValue::text(&customer.city),
            Self::Mobile => SortValue::text(&customer.mobile),
            Self::CompanyName => customer
                .company_name
                .as_deref()
                .map_or(SortValue::Missing, SortValue::text),
            Self::CreditLimit => SortValue::Decimal(customer.credit_limit),
            Self::CreditPeriod => SortValue::Integer(i64::from(customer.credit_period)),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_param(s).ok_or_else(|| format!("unknown sort key: {s}"))
    }
}

/// Comparable projection of one attribute.
///
/// `Missing` is declared first so absent optional values sort before present
/// ones when ascending.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Missing,
    Text(String),
    Decimal(Decimal),
    Integer(i64),
}

impl SortValue {
    fn text(s: &str) -> Self {
        Self::Text(s.to_lowercase())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Active sort column and direction.
///
/// With no key the table shows customers in the order they were received and
/// the direction is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    key: Option<SortKey>,
    direction: SortDirection,
}

impl SortSpec {
    /// Sort by `key` in the given direction.
    #[must_use]
    pub const fn by(key: SortKey, direction: SortDirection) -> Self {
        Self {
            key: Some(key),
            direction,
        }
    }

    /// The active key, if any.
    #[must_use]
    pub const fn key(&self) -> Option<SortKey> {
        self.key
    }

    /// The active direction, meaningful only when a key is set.
    #[must_use]
    pub const fn direction(&self) -> Option<SortDirection> {
        match self.key {
            Some(_) => Some(self.direction),
            None => None,
        }
    }

    /// Select `key`: the active key flips direction, any other key starts
    /// ascending.
    #[must_use]
    pub fn toggled(self, key: SortKey) -> Self {
        if self.key == Some(key) {
            Self {
                key: Some(key),
                direction: self.direction.flipped(),
            }
        } else {
            Self::by(key, SortDirection::Ascending)
        }
    }

    /// Stable display order of `customers` as indices into the slice.
    ///
    /// Only customers matching `filter` are included (see [`matches_filter`]).
    #[must_use]
    pub fn order(&self, customers: &[Customer], filter: &str) -> Vec<usize> {
        let needle = filter.trim().to_lowercase();
        let visible = customers
            .iter()
            .enumerate()
            .filter(|(_, customer)| matches_filter(customer, &needle));

        let Some(key) = self.key else {
            return visible.map(|(index, _)| index).collect();
        };

        let mut keyed: Vec<(SortValue, usize)> = visible
            .map(|(index, customer)| (key.value(customer), index))
            .collect();
        // `sort_by` is stable: equal values keep their fetch order in both directions.
        keyed.sort_by(|(a, _), (b, _)| self.direction.apply(a.cmp(b)));
        keyed.into_iter().map(|(_, index)| index).collect()
    }
}

/// Case-insensitive substring match over the searchable columns.
///
/// `needle` must already be lowercased; an empty needle matches everything.
#[must_use]
pub fn matches_filter(customer: &Customer, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [
        customer.first_name.as_str(),
        customer.last_name.as_str(),
        customer.email.as_str(),
        customer.city.as_str(),
        customer.mobile.as_str(),
        customer.company_name.as_deref().unwrap_or_default(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Ordered, filtered view over a borrowed customer collection.
///
/// The order is computed lazily on first use and reused by every later
/// iteration, so the view can be walked any number of times.
#[derive(Debug)]
pub struct SortedView<'a> {
    customers: &'a [Customer],
    spec: SortSpec,
    filter: &'a str,
    order: OnceCell<Vec<usize>>,
}

impl<'a> SortedView<'a> {
    /// Create a view; nothing is sorted until the view is read.
    #[must_use]
    pub const fn new(customers: &'a [Customer], spec: SortSpec, filter: &'a str) -> Self {
        Self {
            customers,
            spec,
            filter,
            order: OnceCell::new(),
        }
    }

    /// The sort specification this view was built with.
    #[must_use]
    pub const fn spec(&self) -> SortSpec {
        self.spec
    }

    fn order(&self) -> &[usize] {
        self.order
            .get_or_init(|| self.spec.order(self.customers, self.filter))
    }

    /// Iterate the customers in display order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Customer> + '_ {
        let customers = self.customers;
        self.order()
            .iter()
            .filter_map(move |&index| customers.get(index))
    }

    /// Number of visible customers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order().len()
    }

    /// Whether no customer is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order().is_empty()
    }

    /// Clone the visible customers in display order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Customer> {
        self.iter().cloned().collect()
    }
}

impl<'v, 'a> IntoIterator for &'v SortedView<'a> {
    type Item = &'a Customer;
    type IntoIter = Box<dyn Iterator<Item = &'a Customer> + 'v>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
