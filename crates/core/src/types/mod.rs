//! Core types for Customer Desk.
//!
//! This module provides type-safe wrappers for the customer domain.

pub mod customer;
pub mod email;
pub mod id;

pub use customer::{Customer, CustomerCategory, ParseChoiceError, Title};
pub use email::{Email, EmailError};
pub use id::*;
