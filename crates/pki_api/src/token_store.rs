//! Persistence of the access and refresh token between runs.

use crate::error::TokenStoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Token pair returned by `/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Storage for the session tokens.
///
/// Implementations must be cheap to read, the client asks for the access
/// token on every request.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<Tokens>;
    fn save(&self, tokens: &Tokens) -> Result<(), TokenStoreError>;
    fn clear(&self) -> Result<(), TokenStoreError>;

    fn access_token(&self) -> Option<String> {
        self.load()
            .map(|t| t.access_token)
            .filter(|t| !t.is_empty())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory store for tests and `--ephemeral` sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<Tokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: Tokens) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<Tokens> {
        lock(&self.tokens).clone()
    }

    fn save(&self, tokens: &Tokens) -> Result<(), TokenStoreError> {
        *lock(&self.tokens) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *lock(&self.tokens) = None;
        Ok(())
    }
}

/// JSON file `{"accessToken": …, "refreshToken": …}` with an in-memory copy.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: Mutex<Option<Tokens>>,
}

impl FileTokenStore {
    /// Opens the store. A missing file means "no session"; an unreadable or
    /// malformed one is logged and treated the same way.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = match Self::read(&path) {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unreadable session file");
                None
            }
        };
        Self {
            path,
            cached: Mutex::new(cached),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<Option<Tokens>, TokenStoreError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<Tokens> {
        lock(&self.cached).clone()
    }

    fn save(&self, tokens: &Tokens) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(tokens)?;
        std::fs::write(&self.path, json)?;
        *lock(&self.cached) = Some(tokens.clone());
        tracing::debug!(path = %self.path.display(), "session tokens saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *lock(&self.cached) = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens() -> Tokens {
        Tokens {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
        }
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("portal.session.json");

        let store = FileTokenStore::open(&path);
        assert_eq!(store.load(), None);
        store.save(&tokens()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["accessToken"], "access");
        assert_eq!(raw["refreshToken"], "refresh");

        let reopened = FileTokenStore::open(&path);
        assert_eq!(reopened.access_token().as_deref(), Some("access"));
    }

    #[test]
    fn file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.session.json");
        let store = FileTokenStore::open(&path);
        store.save(&tokens()).unwrap();

        store.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(store.access_token(), None);
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn malformed_file_is_treated_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.session.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileTokenStore::open(&path);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn empty_access_token_counts_as_missing() {
        let store = MemoryTokenStore::with_tokens(Tokens {
            access_token: String::new(),
            refresh_token: "r".into(),
        });
        assert_eq!(store.access_token(), None);
    }
}
