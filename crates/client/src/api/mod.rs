//! Customer API client.
//!
//! Talks to the customer REST backend over JSON (multipart when a photo is
//! uploaded).
//!
//! # Endpoints
//!
//! - `POST api/auth/token/` - exchange credentials for an access/refresh pair
//! - `GET api/auth/profile/` - the logged-in user's profile
//! - `GET|POST cms/customers/` - list and create customers
//! - `PUT|DELETE cms/customers/{id}/` - replace and delete a customer
//!
//! Every endpoint except the token exchange requires
//! `Authorization: Bearer <access>`. A `401` on any of them clears the stored
//! session and surfaces as [`ApiError::Unauthenticated`].

mod auth;
mod customers;

pub use auth::Profile;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::session::{Session, SessionError};

/// Errors that can occur when interacting with the customer API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No session, or the server rejected the access token.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The token endpoint rejected the username/password.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The server rejected the submitted fields.
    #[error("Validation failed: {0}")]
    Validation(ServerErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Failed to build a request URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Tokens could not be persisted.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Field errors from a `400` response, keyed by field name.
///
/// Non-field messages (`detail`, `non_field_errors`) are kept under their own
/// keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerErrors(BTreeMap<String, Vec<String>>);

impl ServerErrors {
    /// Parse a DRF-style error body: an object whose values are a message or
    /// a list of messages.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        let Value::Object(map) = serde_json::from_str::<Value>(body).ok()? else {
            return None;
        };
        let errors: BTreeMap<String, Vec<String>> = map
            .into_iter()
            .map(|(field, value)| (field, messages(value)))
            .filter(|(_, messages)| !messages.is_empty())
            .collect();
        (!errors.is_empty()).then_some(Self(errors))
    }

    /// Messages reported for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// All field/messages pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ServerErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, messages)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}

fn messages(value: Value) -> Vec<String> {
    match value {
        Value::String(message) => vec![message],
        Value::Array(items) => items.into_iter().flat_map(messages).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// The human-readable message of an error body, if it carries one.
fn detail_message(body: &str) -> Option<String> {
    let errors = ServerErrors::parse(body)?;
    ["detail", "non_field_errors", "error"]
        .into_iter()
        .find_map(|key| errors.get(key).map(|messages| messages.join(" ")))
}

/// Customer API client.
///
/// Cheap to clone; clones share one connection pool. No request timeout is
/// configured.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("customer-desk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner { client, base_url }),
        })
    }

    /// Base URL every path is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Resolve a relative API path.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Attach the session's bearer token and send.
    ///
    /// Fails with `Unauthenticated` without touching the network when there
    /// is no token. A `401` clears the session.
    pub(crate) async fn send_authorized(
        &self,
        session: &Session,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let token = session.access_token().ok_or(ApiError::Unauthenticated)?;
        let response = request.bearer_auth(token.expose_secret()).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("access token rejected; clearing session");
            if let Err(e) = session.clear() {
                warn!(error = %e, "failed to clear session");
            }
            return Err(ApiError::Unauthenticated);
        }

        Ok(response)
    }

    /// Handle API response and parse JSON.
    pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Parse error response from the API.
    pub(crate) async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthenticated,
            StatusCode::NOT_FOUND => ApiError::NotFound(
                detail_message(&body).unwrap_or_else(|| "Resource not found".to_string()),
            ),
            StatusCode::BAD_REQUEST => match ServerErrors::parse(&body) {
                Some(errors) => ApiError::Validation(errors),
                None => ApiError::Api {
                    status: status.as_u16(),
                    message: body,
                },
            },
            _ => ApiError::Api {
                status: status.as_u16(),
                message: detail_message(&body).unwrap_or(body),
            },
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_parse_field_lists() {
        let errors = ServerErrors::parse(
            r#"{"email": ["customer with this email already exists."], "city": "bad", "photo": null}"#,
        )
        .unwrap();
        assert_eq!(
            errors.get("email").unwrap(),
            ["customer with this email already exists.".to_string()]
        );
        assert_eq!(errors.get("city").unwrap(), ["bad".to_string()]);
        assert!(errors.get("photo").is_none());
        assert_eq!(
            errors.to_string(),
            "city: bad; email: customer with this email already exists."
        );
    }

    #[test]
    fn test_server_errors_reject_non_objects() {
        assert!(ServerErrors::parse("<html>oops</html>").is_none());
        assert!(ServerErrors::parse(r#"["a"]"#).is_none());
        assert!(ServerErrors::parse("{}").is_none());
    }

    #[test]
    fn test_detail_message() {
        assert_eq!(
            detail_message(r#"{"detail": "No active account found with the given credentials"}"#)
                .as_deref(),
            Some("No active account found with the given credentials")
        );
        assert_eq!(detail_message(r#"{"email": ["taken"]}"#), None);
    }

    #[test]
    fn test_endpoint_resolves_beneath_base() {
        let client = ApiClient::new(Url::parse("http://localhost:8000/backend/").unwrap()).unwrap();
        assert_eq!(
            client.endpoint("cms/customers/").unwrap().as_str(),
            "http://localhost:8000/backend/cms/customers/"
        );
    }

    #[tokio::test]
    async fn test_send_without_token_is_unauthenticated() {
        // Port 9 is discard; the request must never be sent.
        let client = ApiClient::new(Url::parse("http://127.0.0.1:9/").unwrap()).unwrap();
        let request = client.http().get(client.endpoint("cms/customers/").unwrap());
        let err = client
            .send_authorized(&Session::in_memory(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }
}
