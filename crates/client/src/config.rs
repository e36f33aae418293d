//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CUSTOMER_DESK_API_BASE_URL` - Base URL of the customer API. Overrides
//!   the value baked in at build time (default: `http://127.0.0.1:8000`)
//! - `CUSTOMER_DESK_SESSION_FILE` - Where the bearer tokens are stored
//!   (default: `<config dir>/customer-desk/session.json`)

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Base URL used when nothing is configured at build time or run time.
pub const DEFAULT_API_BASE_URL: &str = match option_env!("CUSTOMER_DESK_API_BASE_URL") {
    Some(url) => url,
    None => "http://127.0.0.1:8000",
};

const API_BASE_URL_VAR: &str = "CUSTOMER_DESK_API_BASE_URL";
const SESSION_FILE_VAR: &str = "CUSTOMER_DESK_SESSION_FILE";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid API base URL {0:?}: {1}")]
    InvalidBaseUrl(String, String),
    #[error("No configuration directory available; set {SESSION_FILE_VAR}")]
    NoConfigDir,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every API path is resolved against. Always ends with `/`.
    pub api_base_url: Url,
    /// JSON file holding the current session's tokens.
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL does not parse or no session
    /// file location can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(&get_env_or_default(API_BASE_URL_VAR, DEFAULT_API_BASE_URL))
            .map_err(|e| match e {
                ConfigError::InvalidBaseUrl(_, reason) => {
                    ConfigError::InvalidEnvVar(API_BASE_URL_VAR.to_string(), reason)
                }
                other => other,
            })?;
        let session_file = match get_optional_env(SESSION_FILE_VAR) {
            Some(path) => PathBuf::from(path),
            None => default_session_file()?,
        };

        Ok(Self {
            api_base_url,
            session_file,
        })
    }

    /// Replace the base URL, e.g. from a command-line flag.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if `raw` is not an http(s) URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_base_url = parse_base_url(raw)?;
        Ok(self)
    }
}

/// Parse an API base URL, forcing a trailing slash so relative paths join
/// beneath it instead of replacing its last segment.
///
/// # Errors
///
/// Returns `ConfigError::InvalidBaseUrl` for unparseable or non-http(s) URLs.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl(raw.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl(
            raw.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Default session file under the platform config directory.
fn default_session_file() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("customer-desk").join("session.json"))
        .ok_or(ConfigError::NoConfigDir)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("http://localhost:8000").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/");

        let url = parse_base_url("https://crm.example.com/backend").unwrap();
        assert_eq!(url.as_str(), "https://crm.example.com/backend/");
        assert_eq!(
            url.join("cms/customers/").unwrap().as_str(),
            "https://crm.example.com/backend/cms/customers/"
        );
    }

    #[test]
    fn test_parse_base_url_keeps_existing_slash() {
        let url = parse_base_url(" http://127.0.0.1:8000/ ").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(matches!(
            parse_base_url("ftp://example.com"),
            Err(ConfigError::InvalidBaseUrl(..))
        ));
        assert!(matches!(
            parse_base_url("not a url"),
            Err(ConfigError::InvalidBaseUrl(..))
        ));
    }

    #[test]
    fn test_default_base_url_parses() {
        assert!(parse_base_url(DEFAULT_API_BASE_URL).is_ok());
    }

    #[test]
    fn test_with_base_url_overrides() {
        let config = ClientConfig {
            api_base_url: parse_base_url(DEFAULT_API_BASE_URL).unwrap(),
            session_file: PathBuf::from("/tmp/session.json"),
        }
        .with_base_url("https://api.example.com")
        .unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://api.example.com/");
        assert_eq!(config.session_file, PathBuf::from("/tmp/session.json"));
    }
}
