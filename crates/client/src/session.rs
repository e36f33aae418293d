//! Bearer token persistence.
//!
//! A session is the access/refresh token pair returned by a successful login.
//! It outlives the process: the file store writes it to a small JSON document
//! so the next invocation starts authenticated. A session exists exactly
//! while the store holds an access token.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by a [`SessionStore`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Stored session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Access and refresh tokens issued by the auth endpoint.
///
/// Implements `Debug` manually to redact both tokens.
#[derive(Clone)]
pub struct TokenPair {
    pub access: SecretString,
    pub refresh: SecretString,
}

impl TokenPair {
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: SecretString::from(access.into()),
            refresh: SecretString::from(refresh.into()),
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .finish()
    }
}

/// Persistent storage for the current token pair.
pub trait SessionStore: Send + Sync {
    /// The stored tokens, or `None` when logged out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the backing storage cannot be read.
    fn load(&self) -> Result<Option<TokenPair>, SessionError>;

    /// Replace the stored tokens.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the backing storage cannot be written.
    fn save(&self, tokens: &TokenPair) -> Result<(), SessionError>;

    /// Forget the stored tokens. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the backing storage cannot be removed.
    fn clear(&self) -> Result<(), SessionError>;
}

/// On-disk layout of the session file.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    access: String,
    refresh: String,
    saved_at: DateTime<Utc>,
}

/// Stores the session as a JSON file, readable only by its owner on unix.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the stored session was written, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the file exists but cannot be read.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>, SessionError> {
        Ok(self.read()?.map(|stored| stored.saved_at))
    }

    fn read(&self) -> Result<Option<StoredSession>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let stored: StoredSession = serde_json::from_str(&contents)?;
        Ok((!stored.access.is_empty()).then_some(stored))
    }

    #[cfg(unix)]
    fn write(&self, contents: &[u8]) -> io::Result<()> {
        use std::io::Write;
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)?;
        // mode() only applies on creation
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(contents)
    }

    #[cfg(not(unix))]
    fn write(&self, contents: &[u8]) -> io::Result<()> {
        fs::write(&self.path, contents)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<TokenPair>, SessionError> {
        Ok(self
            .read()?
            .map(|stored| TokenPair::new(stored.access, stored.refresh)))
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stored = StoredSession {
            access: tokens.access.expose_secret().to_owned(),
            refresh: tokens.refresh.expose_secret().to_owned(),
            saved_at: Utc::now(),
        };
        self.write(&serde_json::to_vec_pretty(&stored)?)?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the session in memory only.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<TokenPair>, SessionError> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), SessionError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Handle to the current session, shared by every component that talks to
/// the API.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl Session {
    #[must_use]
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// A session backed by the JSON file at `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileSessionStore::new(path))
    }

    /// A session that lives only as long as this process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemorySessionStore::default())
    }

    /// Store a freshly issued token pair.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store cannot be written.
    pub fn set(&self, tokens: &TokenPair) -> Result<(), SessionError> {
        self.store.save(tokens)
    }

    /// Log out by forgetting the stored tokens.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store cannot be cleared.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.store.clear()
    }

    /// The stored token pair. Unreadable storage counts as logged out.
    #[must_use]
    pub fn tokens(&self) -> Option<TokenPair> {
        match self.store.load() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "failed to read session; treating as logged out");
                None
            }
        }
    }

    /// The bearer token to attach to authenticated requests.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.tokens().map(|tokens| tokens.access)
    }

    /// Whether an access token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        assert!(store.load().unwrap().is_none());
        store.save(&TokenPair::new("access-1", "refresh-1")).unwrap();

        let tokens = store.load().unwrap().unwrap();
        assert_eq!(tokens.access.expose_secret(), "access-1");
        assert_eq!(tokens.refresh.expose_secret(), "refresh-1");
        assert!(store.saved_at().unwrap().is_some());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_uses_fixed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileSessionStore::new(&path)
            .save(&TokenPair::new("a", "r"))
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["access"], "a");
        assert_eq!(json["refresh"], "r");
        assert!(json["saved_at"].is_string());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileSessionStore::new(&path)
            .save(&TokenPair::new("a", "r"))
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_is_an_error_but_session_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            FileSessionStore::new(&path).load(),
            Err(SessionError::Corrupt(_))
        ));
        assert!(!Session::file(&path).is_authenticated());
    }

    #[test]
    fn test_memory_session() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated());

        session.set(&TokenPair::new("token", "refresh")).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.access_token().unwrap().expose_secret(), "token");

        session.clear().unwrap();
        assert!(session.access_token().is_none());
    }

    #[test]
    fn test_clones_share_the_store() {
        let session = Session::in_memory();
        let other = session.clone();
        session.set(&TokenPair::new("token", "refresh")).unwrap();
        assert!(other.is_authenticated());
    }

    #[test]
    fn test_token_pair_debug_redacts() {
        let debug = format!("{:?}", TokenPair::new("very-secret", "also-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
    }
}
