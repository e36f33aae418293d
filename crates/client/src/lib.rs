//! Customer Desk client.
//!
//! Everything between the terminal surface and the customer API:
//!
//! - [`config`]: API base URL and session file location from the environment
//! - [`session`]: bearer token persistence
//! - [`api`]: typed REST client for auth and customer endpoints
//! - [`table`]: the customer dashboard's collection, sort and filter state
//! - [`form`]: create/edit form lifecycle on top of local validation
//! - [`route`]: page routing with the session guard
//! - [`notice`]: transient success and error banners

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod form;
pub mod notice;
pub mod route;
pub mod session;
pub mod table;

pub use api::{ApiClient, ApiError, Profile, ServerErrors};
pub use config::{ClientConfig, ConfigError};
pub use form::{CustomerForm, FormError, FormMode};
pub use notice::{Notice, NoticeBoard, NoticeKind};
pub use route::Route;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionError, SessionStore, TokenPair};
pub use table::{Completion, Confirm, CustomerTable, DeleteOutcome, TableError};
