//! Cart store.
//!
//! A mirror of the server cart. Every mutation sends the intended change and
//! adopts the cart the backend returns, replacing local state wholesale.
//! Mutations on the same line run one at a time; responses that arrive after
//! a newer one has been applied are dropped.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use sole_society_core::{Cart, LineKey};

use super::inflight::{KeyedLocks, Sequencer, Versioned};
use super::session::{SessionState, SessionStore};
use crate::api::ApiClient;
use crate::error::{ClientError, Result};

/// Shared handle to the cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    api: ApiClient,
    session: SessionStore,
    state: RwLock<Versioned<Cart>>,
    seq: Sequencer,
    lines: KeyedLocks<LineKey>,
}

impl CartStore {
    #[must_use]
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        Self {
            inner: Arc::new(CartInner {
                api,
                session,
                state: RwLock::new(Versioned::new(Cart::empty())),
                seq: Sequencer::new(),
                lines: KeyedLocks::new(),
            }),
        }
    }

    /// Snapshot of the current cart.
    pub async fn cart(&self) -> Cart {
        self.inner.state.read().await.get().clone()
    }

    /// Total units across all lines.
    pub async fn item_count(&self) -> u32 {
        self.inner.state.read().await.get().item_count()
    }

    /// Follow an identity change: refetch for a user, empty otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the refetch fails; the previous cart is
    /// kept in that case.
    pub async fn on_identity_change(&self, state: &SessionState) -> Result<Cart> {
        match state {
            SessionState::Authenticated(_) => self.refresh().await,
            SessionState::Unknown | SessionState::Anonymous => Ok(self.clear_local().await),
        }
    }

    /// Refetch the cart. Anonymous sessions get an empty cart without a call.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the request fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Cart> {
        if !self.inner.session.is_authenticated() {
            return Ok(self.clear_local().await);
        }
        let seq = self.inner.seq.next();
        let cart = self.inner.api.cart().await?;
        Ok(self.commit(seq, cart).await)
    }

    /// Add units of a line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or
    /// `ClientError::Api` if the backend refuses (for example, no stock).
    #[instrument(skip(self), fields(line = %key))]
    pub async fn add(&self, key: &LineKey, quantity: u32) -> Result<Cart> {
        self.require_session()?;
        let _line = self.inner.lines.acquire(key).await;
        let seq = self.inner.seq.next();
        let cart = self.inner.api.add_to_cart(key, quantity.max(1)).await?;
        Ok(self.commit(seq, cart).await)
    }

    /// Set a line's quantity. Values below 1 are raised to 1; use
    /// [`remove`](Self::remove) to drop a line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or
    /// `ClientError::Api` if the backend refuses.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn set_quantity(&self, key: &LineKey, quantity: u32) -> Result<Cart> {
        self.require_session()?;
        let _line = self.inner.lines.acquire(key).await;
        self.send_quantity(key, quantity.max(1)).await
    }

    /// Add one unit to an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the line is not in the cart.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn increment(&self, key: &LineKey) -> Result<Cart> {
        self.require_session()?;
        let _line = self.inner.lines.acquire(key).await;
        let current = self.line_quantity(key).await?;
        self.send_quantity(key, current.saturating_add(1)).await
    }

    /// Remove one unit from an existing line, never going below 1.
    ///
    /// At quantity 1 this is a no-op and no request is sent.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the line is not in the cart.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn decrement(&self, key: &LineKey) -> Result<Cart> {
        self.require_session()?;
        let _line = self.inner.lines.acquire(key).await;
        let current = self.line_quantity(key).await?;
        if current <= 1 {
            debug!("Quantity already at minimum");
            return Ok(self.cart().await);
        }
        self.send_quantity(key, current - 1).await
    }

    /// Remove a line entirely.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or
    /// `ClientError::Api` if the request fails.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn remove(&self, key: &LineKey) -> Result<Cart> {
        self.require_session()?;
        let _line = self.inner.lines.acquire(key).await;
        let seq = self.inner.seq.next();
        let cart = self.inner.api.remove_from_cart(key).await?;
        Ok(self.commit(seq, cart).await)
    }

    /// Empty the local mirror (after logout or a placed order).
    pub async fn clear_local(&self) -> Cart {
        let seq = self.inner.seq.next();
        self.commit(seq, Cart::empty()).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_session(&self) -> Result<()> {
        if self.inner.session.is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }

    async fn line_quantity(&self, key: &LineKey) -> Result<u32> {
        self.inner
            .state
            .read()
            .await
            .get()
            .line(key)
            .map(|item| item.quantity)
            .ok_or_else(|| ClientError::NotFound(format!("cart line {key}")))
    }

    async fn send_quantity(&self, key: &LineKey, quantity: u32) -> Result<Cart> {
        let seq = self.inner.seq.next();
        let cart = self.inner.api.update_cart_item(key, quantity).await?;
        Ok(self.commit(seq, cart).await)
    }

    /// Apply a response if it is the newest seen; return the resulting cart.
    async fn commit(&self, seq: u64, cart: Cart) -> Cart {
        let mut state = self.inner.state.write().await;
        if !state.apply(seq, cart) {
            debug!(seq, applied = state.version(), "Dropping stale cart response");
        }
        state.get().clone()
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use sole_society_core::ProductId;

    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::SessionStorage;

    fn store() -> CartStore {
        let config =
            ClientConfig::for_backend("http://127.0.0.1:9/api", PathBuf::from("unused")).unwrap();
        let api = ApiClient::new(&config).unwrap();
        let session = SessionStore::new(api.clone(), SessionStorage::memory());
        CartStore::new(api, session)
    }

    #[tokio::test]
    async fn test_anonymous_refresh_is_empty_without_network() {
        let cart = store().refresh().await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_require_session() {
        let key = LineKey::new(ProductId::new("P1"), "M", "Red");
        let err = store().add(&key, 1).await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_stale_commit_is_ignored() {
        let store = store();
        let older = store.inner.seq.next();
        let newer = store.inner.seq.next();

        let fresh: Cart = serde_json::from_str(
            r#"{"items": [{"product": "P1", "quantity": 3, "size": "M", "color": "Red"}]}"#,
        )
        .unwrap();
        store.commit(newer, fresh.clone()).await;
        let result = store.commit(older, Cart::empty()).await;

        assert_eq!(result, fresh);
        assert_eq!(store.cart().await, fresh);
    }
}
