//! Persisted session storage.
//!
//! The signed-in user and bearer token survive process restarts in a small
//! JSON file. The in-memory variant backs tests and embedders that keep no
//! state on disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use sole_society_core::User;

/// Errors reading or writing the persisted session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// What is written to disk.
#[derive(Debug, Clone)]
pub struct PersistedSession {
    pub user: User,
    pub token: Option<SecretString>,
}

#[derive(Serialize, Deserialize)]
struct SessionFile {
    user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

impl From<&PersistedSession> for SessionFile {
    fn from(session: &PersistedSession) -> Self {
        Self {
            user: session.user.clone(),
            token: session
                .token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
        }
    }
}

impl From<SessionFile> for PersistedSession {
    fn from(file: SessionFile) -> Self {
        Self {
            user: file.user,
            token: file
                .token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
        }
    }
}

/// Where the session is persisted.
#[derive(Debug, Clone)]
pub enum SessionStorage {
    /// JSON file on disk.
    File(PathBuf),
    /// Process memory only.
    Memory(Arc<Mutex<Option<PersistedSession>>>),
}

impl SessionStorage {
    /// File-backed storage.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Empty in-memory storage.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(Arc::new(Mutex::new(None)))
    }

    /// Load the persisted session, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        match self {
            Self::File(path) => load_file(path).await,
            Self::Memory(slot) => Ok(lock(slot).clone()),
        }
    }

    /// Overwrite the persisted session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the file cannot be written.
    pub async fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        match self {
            Self::File(path) => save_file(path, session).await,
            Self::Memory(slot) => {
                *lock(slot) = Some(session.clone());
                Ok(())
            }
        }
    }

    /// Remove the persisted session. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if an existing file cannot be removed.
    pub async fn clear(&self) -> Result<(), StorageError> {
        match self {
            Self::File(path) => match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(StorageError::Io {
                    path: path.clone(),
                    source,
                }),
            },
            Self::Memory(slot) => {
                *lock(slot) = None;
                Ok(())
            }
        }
    }
}

fn lock(
    slot: &Mutex<Option<PersistedSession>>,
) -> std::sync::MutexGuard<'_, Option<PersistedSession>> {
    // A poisoned slot still holds a usable value.
    slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

async fn load_file(path: &Path) -> Result<Option<PersistedSession>, StorageError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No persisted session");
            return Ok(None);
        }
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let file: SessionFile = serde_json::from_slice(&raw).inspect_err(|e| {
        warn!(path = %path.display(), error = %e, "Persisted session is unreadable");
    })?;
    Ok(Some(file.into()))
}

async fn save_file(path: &Path, session: &PersistedSession) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let json = serde_json::to_vec_pretty(&SessionFile::from(session))?;

    // Write then rename so a crash never leaves a half-written file.
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sole_society_core::{Role, UserId};

    use super::*;

    fn session(token: Option<&str>) -> PersistedSession {
        PersistedSession {
            user: User {
                id: UserId::new("U1"),
                username: "asha".into(),
                email: "asha@example.com".into(),
                role: Role::Customer,
                profile_image: None,
                token: None,
            },
            token: token.map(SecretString::from),
        }
    }

    #[tokio::test]
    async fn test_file_round_trip_keeps_token() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::file(dir.path().join("nested/session.json"));

        assert!(storage.load().await.unwrap().is_none());

        storage.save(&session(Some("tok-1"))).await.unwrap();
        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.user.username, "asha");
        assert_eq!(loaded.token.unwrap().expose_secret(), "tok-1");
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::file(dir.path().join("session.json"));

        storage.save(&session(None)).await.unwrap();
        storage.clear().await.unwrap();
        storage.clear().await.unwrap();
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let result = SessionStorage::file(&path).load().await;
        assert!(matches!(result, Err(StorageError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = SessionStorage::memory();
        storage.save(&session(Some("t"))).await.unwrap();
        assert!(storage.load().await.unwrap().is_some());
        storage.clear().await.unwrap();
        assert!(storage.load().await.unwrap().is_none());
    }
}
