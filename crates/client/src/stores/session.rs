//! Session store.
//!
//! Holds who is signed in. Starts [`SessionState::Unknown`] until
//! [`SessionStore::restore`] settles it. Every identity change is published on
//! a watch channel so dependent stores can refetch.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use sole_society_core::User;

use crate::api::ApiClient;
use crate::error::Result;
use crate::storage::{PersistedSession, SessionStorage, StorageError};

/// Identity as far as the client knows.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// Restore has not finished yet.
    #[default]
    Unknown,
    Authenticated(User),
    Anonymous,
}

impl SessionState {
    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unknown | Self::Anonymous => None,
        }
    }

    /// Whether the state is settled (not `Unknown`).
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Shared handle to the session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    storage: SessionStorage,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    #[must_use]
    pub fn new(api: ApiClient, storage: SessionStorage) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            inner: Arc::new(SessionInner {
                api,
                storage,
                state,
            }),
        }
    }

    /// Receive every identity change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().user().is_some()
    }

    /// Settle the session from persisted storage.
    ///
    /// A persisted user with a token is confirmed against the profile
    /// endpoint. Any failure (unreadable file, missing token, rejected
    /// profile) leaves the session anonymous and drops the persisted copy.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> SessionState {
        let persisted = match self.inner.storage.load().await {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                None
            }
        };

        let Some(PersistedSession {
            user,
            token: Some(token),
        }) = persisted
        else {
            debug!("No persisted credential, session is anonymous");
            self.clear_local().await;
            return self.state();
        };

        self.inner.api.set_token(Some(token)).await;

        match self.inner.api.profile().await {
            Ok(profile) => {
                let user = user.with_profile(profile);
                info!(user_id = %user.id, "Session restored");
                if let Err(e) = self.adopt(user).await {
                    warn!(error = %e, "Failed to persist restored session");
                }
            }
            Err(e) => {
                info!(error = %e, "Persisted session rejected by backend");
                self.clear_local().await;
            }
        }

        self.state()
    }

    /// Replace the signed-in user, in memory and in storage.
    ///
    /// A token on `user` replaces the client's bearer token; without one the
    /// current token is kept.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the session cannot be persisted. The
    /// in-memory state is updated regardless.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn set_user(&self, user: User) -> Result<()> {
        self.adopt(user).await.map_err(Into::into)
    }

    /// End the session.
    ///
    /// Memory, storage and the bearer token are cleared whatever the backend
    /// says; a backend failure is still returned so callers can report it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the backend logout call failed.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let backend = self.inner.api.logout().await;
        if let Err(e) = &backend {
            warn!(error = %e, "Backend logout failed, clearing local session anyway");
        }
        self.clear_local().await;
        backend.map_err(Into::into)
    }

    /// Forget the session locally without contacting the backend.
    pub async fn clear_local(&self) {
        self.inner.api.clear_token().await;
        if let Err(e) = self.inner.storage.clear().await {
            warn!(error = %e, "Failed to remove persisted session");
        }
        self.inner.state.send_replace(SessionState::Anonymous);
    }

    /// Re-persist after the API client rotated the token.
    pub async fn persist_refreshed_token(&self) {
        if let Some(user) = self.user() {
            debug!("Persisting refreshed token");
            if let Err(e) = self.adopt(user).await {
                warn!(error = %e, "Failed to persist refreshed token");
            }
        }
    }

    async fn adopt(&self, mut user: User) -> std::result::Result<(), StorageError> {
        if let Some(token) = user.token.take() {
            self.inner.api.set_token(Some(token)).await;
        }
        let token = self.inner.api.token().await;
        user.token.clone_from(&token);

        self.inner
            .state
            .send_replace(SessionState::Authenticated(user.clone()));

        self.inner
            .storage
            .save(&PersistedSession { user, token })
            .await
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}
