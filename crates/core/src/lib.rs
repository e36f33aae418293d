//! Customer Desk Core - Shared types library.
//!
//! This crate provides the types used across all Customer Desk components:
//! - `client` - REST API client, session handling and the customer table state
//! - `cli` - Terminal front end (`cdesk`)
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. Everything here can be tested without a server.
//!
//! # Modules
//!
//! - [`types`] - Customer record, enums, newtype IDs and email addresses
//! - [`sort`] - Sort specification and the stable, lazily derived table view
//! - [`form`] - Transient create/edit form state
//! - [`validation`] - Local field validation producing a [`CustomerDraft`]

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod form;
pub mod sort;
pub mod types;
pub mod validation;

pub use form::{Attachment, Field, FieldValue, FormState};
pub use sort::{SortDirection, SortKey, SortSpec, SortedView};
pub use types::*;
pub use validation::{AllowedCities, CustomerDraft, ValidationError, ValidationErrors};
