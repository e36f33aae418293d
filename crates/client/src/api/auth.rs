//! Login and profile endpoints.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{detail_message, ApiClient, ApiError};
use crate::session::{Session, TokenPair};

const TOKEN_PATH: &str = "api/auth/token/";
const PROFILE_PATH: &str = "api/auth/profile/";

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access: String,
    refresh: String,
}

/// The logged-in user's profile.
///
/// Only `username` is guaranteed; anything else the server sends is kept in
/// `extra` for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ApiClient {
    /// Exchange credentials for a token pair and store it in `session`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidCredentials` when the server rejects the
    /// username/password, or another `ApiError` if the request or storing
    /// the tokens fails.
    #[instrument(skip(self, session, password))]
    pub async fn login(
        &self,
        session: &Session,
        username: &str,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(TOKEN_PATH)?;
        let response = self
            .http()
            .post(url)
            .json(&TokenRequest {
                username,
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::InvalidCredentials(
                detail_message(&body).unwrap_or_else(|| "Invalid username or password".to_string()),
            ));
        }

        let tokens: TokenResponse = Self::handle_response(response).await?;
        session.set(&TokenPair::new(tokens.access, tokens.refresh))?;
        info!("logged in");
        Ok(())
    }

    /// Fetch the logged-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` without a session or when the
    /// token is rejected.
    #[instrument(skip(self, session))]
    pub async fn profile(&self, session: &Session) -> Result<Profile, ApiError> {
        let url = self.endpoint(PROFILE_PATH)?;
        let response = self.send_authorized(session, self.http().get(url)).await?;
        Self::handle_response(response).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_keeps_extra_fields() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "username": "admin",
            "email": "admin@example.com",
            "is_staff": true
        }))
        .unwrap();
        assert_eq!(profile.username, "admin");
        assert_eq!(profile.extra["email"], "admin@example.com");
        assert_eq!(profile.extra.len(), 2);
    }

    #[test]
    fn test_token_request_shape() {
        let json = serde_json::to_value(TokenRequest {
            username: "admin",
            password: "pw",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"username": "admin", "password": "pw"}));
    }
}
