//! Wishlist store.
//!
//! Same wholesale-replace pattern as the cart. Membership is a set of product
//! ids recomputed whenever the list changes.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use sole_society_core::{Product, ProductId};

use super::inflight::{KeyedLocks, Sequencer, Versioned};
use super::session::{SessionState, SessionStore};
use crate::api::ApiClient;
use crate::error::{ClientError, Result};

/// Liked products plus the derived membership set.
#[derive(Debug, Clone, Default)]
pub struct Wishlist {
    products: Vec<Product>,
    ids: HashSet<ProductId>,
}

impl Wishlist {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let ids = products.iter().map(|p| p.id.clone()).collect();
        Self { products, ids }
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Shared handle to the wishlist.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    api: ApiClient,
    session: SessionStore,
    state: RwLock<Versioned<Wishlist>>,
    seq: Sequencer,
    products: KeyedLocks<ProductId>,
}

impl WishlistStore {
    #[must_use]
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        Self {
            inner: Arc::new(WishlistInner {
                api,
                session,
                state: RwLock::new(Versioned::new(Wishlist::default())),
                seq: Sequencer::new(),
                products: KeyedLocks::new(),
            }),
        }
    }

    /// Snapshot of the current wishlist.
    pub async fn wishlist(&self) -> Wishlist {
        self.inner.state.read().await.get().clone()
    }

    /// Whether a product is liked.
    pub async fn contains(&self, id: &ProductId) -> bool {
        self.inner.state.read().await.get().contains(id)
    }

    /// Follow an identity change: refetch for a user, empty otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the refetch fails.
    pub async fn on_identity_change(&self, state: &SessionState) -> Result<Wishlist> {
        match state {
            SessionState::Authenticated(_) => self.refresh().await,
            SessionState::Unknown | SessionState::Anonymous => Ok(self.clear_local().await),
        }
    }

    /// Refetch the wishlist. Anonymous sessions get an empty list.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the request fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Wishlist> {
        if !self.inner.session.is_authenticated() {
            return Ok(self.clear_local().await);
        }
        let seq = self.inner.seq.next();
        let products = self.inner.api.wishlist().await?;
        Ok(self.commit(seq, products).await)
    }

    /// Like a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or
    /// `ClientError::Api` if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn add(&self, id: &ProductId) -> Result<Wishlist> {
        self.require_session()?;
        let _guard = self.inner.products.acquire(id).await;
        let seq = self.inner.seq.next();
        let products = self.inner.api.add_to_wishlist(id).await?;
        Ok(self.commit(seq, products).await)
    }

    /// Unlike a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or
    /// `ClientError::Api` if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove(&self, id: &ProductId) -> Result<Wishlist> {
        self.require_session()?;
        let _guard = self.inner.products.acquire(id).await;
        let seq = self.inner.seq.next();
        let products = self.inner.api.remove_from_wishlist(id).await?;
        Ok(self.commit(seq, products).await)
    }

    /// Add when absent, remove when present. Returns the new membership.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or
    /// `ClientError::Api` if the request fails.
    pub async fn toggle(&self, id: &ProductId) -> Result<bool> {
        let wishlist = if self.contains(id).await {
            self.remove(id).await?
        } else {
            self.add(id).await?
        };
        Ok(wishlist.contains(id))
    }

    /// Empty the local list.
    pub async fn clear_local(&self) -> Wishlist {
        let seq = self.inner.seq.next();
        self.commit(seq, Vec::new()).await
    }

    fn require_session(&self) -> Result<()> {
        if self.inner.session.is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }

    async fn commit(&self, seq: u64, products: Vec<Product>) -> Wishlist {
        let mut state = self.inner.state.write().await;
        if !state.apply(seq, Wishlist::new(products)) {
            debug!(seq, applied = state.version(), "Dropping stale wishlist response");
        }
        state.get().clone()
    }
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str) -> Product {
        serde_json::from_value(serde_json::json!({"_id": id, "name": id, "price": 100})).unwrap()
    }

    #[test]
    fn test_membership_tracks_list() {
        let wishlist = Wishlist::new(vec![product("P1"), product("P2")]);
        assert!(wishlist.contains(&ProductId::new("P1")));
        assert!(!wishlist.contains(&ProductId::new("P3")));
        assert_eq!(wishlist.len(), 2);
    }

    #[test]
    fn test_empty_wishlist() {
        let wishlist = Wishlist::default();
        assert!(wishlist.is_empty());
        assert!(!wishlist.contains(&ProductId::new("P1")));
    }
}
