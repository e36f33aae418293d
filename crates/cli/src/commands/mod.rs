//! Subcommand implementations, one module per page.

pub mod auth;
pub mod customers;
pub mod dashboard;

use std::io;

use customer_desk_client::{
    ApiClient, ApiError, ClientConfig, ConfigError, FormError, Route, Session, SessionError,
    TableError,
};
use customer_desk_core::CustomerId;
use thiserror::Error;

use crate::render::Theme;

/// Exit code for a missing or rejected session.
pub const EXIT_UNAUTHENTICATED: i32 = 2;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The page needs a session and there is none.
    #[error("Not logged in; run `cdesk login` first")]
    NotLoggedIn,

    #[error("Customer {0} not found")]
    NotFound(CustomerId),

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    fn is_unauthenticated(&self) -> bool {
        match self {
            Self::NotLoggedIn | Self::Api(ApiError::Unauthenticated) => true,
            Self::Table(e) => e.is_unauthenticated(),
            Self::Form(e) => e.is_unauthenticated(),
            _ => false,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_unauthenticated() {
            EXIT_UNAUTHENTICATED
        } else {
            1
        }
    }
}

/// Everything a command needs: the API client, the session and the theme.
#[derive(Debug, Clone)]
pub struct Context {
    pub api: ApiClient,
    pub session: Session,
    pub theme: Theme,
}

impl Context {
    /// Build the context from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Api` if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, theme: Theme) -> Result<Self, CliError> {
        Ok(Self {
            api: ApiClient::new(config.api_base_url.clone())?,
            session: Session::file(&config.session_file),
            theme,
        })
    }

    /// Enter `route`, failing when the guard sends the user to the login
    /// page instead.
    ///
    /// # Errors
    ///
    /// Returns `CliError::NotLoggedIn` when `route` needs a session and
    /// there is none.
    pub fn enter(&self, route: Route) -> Result<(), CliError> {
        let shown = route.guard(&self.session);
        if shown == route {
            tracing::debug!(route = %route, "entering page");
            Ok(())
        } else {
            tracing::debug!(requested = %route, shown = %shown, "redirected");
            Err(CliError::NotLoggedIn)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::NotLoggedIn.exit_code(), EXIT_UNAUTHENTICATED);
        assert_eq!(
            CliError::Table(TableError::Unauthenticated).exit_code(),
            EXIT_UNAUTHENTICATED
        );
        assert_eq!(
            CliError::Form(FormError::NoCitiesAvailable).exit_code(),
            1
        );
        assert_eq!(CliError::Usage("bad".into()).exit_code(), 1);
    }
}
