//! Page routing.
//!
//! Four pages exist. Everything except the login page needs a session;
//! asking for one without a session lands on the login page instead, and
//! unknown paths fall back to it as well.

use std::fmt;

use crate::session::Session;

/// A page of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Profile,
    Dashboard,
    AddCustomer,
}

impl Route {
    pub const ALL: [Self; 4] = [Self::Login, Self::Profile, Self::Dashboard, Self::AddCustomer];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Profile => "/profile",
            Self::Dashboard => "/dashboard",
            Self::AddCustomer => "/addcustomer",
        }
    }

    /// The page at `path`. Trailing slashes and case are ignored; anything
    /// unknown resolves to the login page.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.trim();
        let path = path.trim_end_matches('/');
        Self::ALL
            .into_iter()
            .find(|route| route.path().eq_ignore_ascii_case(path))
            .unwrap_or(Self::Login)
    }

    #[must_use]
    pub const fn requires_session(self) -> bool {
        !matches!(self, Self::Login)
    }

    /// The page actually shown when `self` is requested.
    #[must_use]
    pub fn guard(self, session: &Session) -> Self {
        if self.requires_session() && !session.is_authenticated() {
            Self::Login
        } else {
            self
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::TokenPair;

    #[test]
    fn test_from_path() {
        assert_eq!(Route::from_path("/dashboard"), Route::Dashboard);
        assert_eq!(Route::from_path("/dashboard/"), Route::Dashboard);
        assert_eq!(Route::from_path("/AddCustomer"), Route::AddCustomer);
        assert_eq!(Route::from_path("/profile"), Route::Profile);
        assert_eq!(Route::from_path("/"), Route::Login);
        assert_eq!(Route::from_path("/nowhere"), Route::Login);
    }

    #[test]
    fn test_paths_round_trip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), route);
        }
    }

    #[test]
    fn test_guard_redirects_without_session() {
        let session = Session::in_memory();
        assert_eq!(Route::Dashboard.guard(&session), Route::Login);
        assert_eq!(Route::AddCustomer.guard(&session), Route::Login);
        assert_eq!(Route::Profile.guard(&session), Route::Login);
        assert_eq!(Route::Login.guard(&session), Route::Login);

        session.set(&TokenPair::new("a", "r")).unwrap();
        assert_eq!(Route::Dashboard.guard(&session), Route::Dashboard);
        assert_eq!(Route::Login.guard(&session), Route::Login);
    }
}
