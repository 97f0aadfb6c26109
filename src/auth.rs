//! Persisted authentication state.
//!
//! A single local key holds the credential bundle `{access_token, user}`
//! issued by the backend. It is attached as a bearer token to every outgoing
//! request and cleared on 401 responses or explicit logout. The bundle lives
//! in one small JSON state file so a restarted UI process stays logged in.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::types::AuthUser;

/// The persisted credential bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    pub access_token: String,
    pub user: AuthUser,
}

/// Thread-safe store for the current credential bundle.
///
/// Cloning shares the underlying state, like the session store.
#[derive(Debug, Clone)]
pub struct AuthStore {
    inner: Arc<AuthStoreInner>,
}

#[derive(Debug)]
struct AuthStoreInner {
    path: PathBuf,
    data: RwLock<Option<AuthData>>,
}

impl AuthStore {
    /// Open the store backed by the given state file.
    ///
    /// A missing or unreadable file simply means "logged out"; a corrupt
    /// file is treated the same way rather than failing startup.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<AuthData>(&bytes) {
                Ok(data) => Some(data),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt auth state file");
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            inner: Arc::new(AuthStoreInner {
                path,
                data: RwLock::new(data),
            }),
        }
    }

    /// Current access token, if logged in.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner
            .data
            .read()
            .unwrap()
            .as_ref()
            .map(|d| d.access_token.clone())
    }

    /// Current user profile, if logged in.
    #[must_use]
    pub fn user(&self) -> Option<AuthUser> {
        self.inner
            .data
            .read()
            .unwrap()
            .as_ref()
            .map(|d| d.user.clone())
    }

    /// Whether a credential bundle is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.data.read().unwrap().is_some()
    }

    /// Store a fresh credential bundle and persist it.
    pub fn set(&self, data: AuthData) {
        if let Some(parent) = self.inner.path.parent()
            && !parent.as_os_str().is_empty()
        {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_vec_pretty(&data) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&self.inner.path, bytes) {
                    warn!(path = %self.inner.path.display(), error = %e, "Failed to persist auth state");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize auth state"),
        }
        *self.inner.data.write().unwrap() = Some(data);
    }

    /// Clear the credential bundle (logout or 401 handling).
    pub fn clear(&self) {
        *self.inner.data.write().unwrap() = None;
        if let Err(e) = std::fs::remove_file(&self.inner.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.inner.path.display(), error = %e, "Failed to remove auth state file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> AuthData {
        AuthData {
            access_token: "tok-123".to_string(),
            user: AuthUser {
                id: "u1".to_string(),
                username: "analyst".to_string(),
                email: None,
                full_name: None,
                role: Some("analyst".to_string()),
            },
        }
    }

    #[test]
    fn test_set_clear_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let store = AuthStore::open(&path);

        assert!(!store.is_authenticated());
        assert!(store.token().is_none());

        store.set(sample_data());
        assert_eq!(store.token().as_deref(), Some("tok-123"));
        assert!(path.exists());

        // A second store over the same file sees the persisted bundle.
        let reopened = AuthStore::open(&path);
        assert_eq!(reopened.user().unwrap().username, "analyst");

        store.clear();
        assert!(!store.is_authenticated());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_state_file_means_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = AuthStore::open(&path);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthStore::open(dir.path().join("auth.json"));
        let clone = store.clone();

        store.set(sample_data());
        assert!(clone.is_authenticated());

        clone.clear();
        assert!(!store.is_authenticated());
    }
}
