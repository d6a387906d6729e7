//! Storefront context.
//!
//! [`Storefront`] owns the API client and every store, and is the only place
//! that coordinates them: identity changes fan out to the cart, wishlist and
//! order stores, and multi-step flows (login, checkout, reviews, admin
//! fulfillment) run here with their guards.
//!
//! The dependent stores follow the session on their own once
//! [`Storefront::start`] has run: a background task watches the session and
//! reloads them whenever the signed-in user changes, whichever path caused it.

use std::sync::{Arc, OnceLock};

use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use sole_society_core::{
    Cart, Order, OrderId, OrderStatus, Product, ProductId, ShippingAddress, User, UserId,
};

use crate::api::{Acknowledgement, ApiClient, ImageUpload, ProductQuery, ReviewInput};
use crate::assets::AssetResolver;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::storage::SessionStorage;
use crate::stores::{
    CartStore, OrderStore, SessionState, SessionStore, TaskHandle, WishlistStore,
};
use crate::validation::{
    LoginForm, ProductForm, RegisterForm, ReviewForm, ValidationError, ValidationErrors,
    validate_shipping,
};
use crate::views::{AdminOrderBoard, CheckoutSummary, ListingFilter, VariantSelection};

/// Client-side storefront: API client plus all stores.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    api: ApiClient,
    session: SessionStore,
    stores: Dependents,
    assets: AssetResolver,
    token_sync: OnceLock<TaskHandle>,
    identity_sync: OnceLock<TaskHandle>,
}

/// The stores derived from the session, and the user they were last loaded
/// for (`None` while anonymous).
#[derive(Clone)]
struct Dependents {
    cart: CartStore,
    wishlist: WishlistStore,
    orders: OrderStore,
    loaded_for: Arc<Mutex<Option<UserId>>>,
}

impl Dependents {
    /// Reload the stores for `state` unless they already belong to that
    /// user. Concurrent callers queue on `loaded_for`, so one sign-in is
    /// fetched once. Without a user the stores are always emptied, which
    /// needs no network.
    async fn follow(&self, state: &SessionState) {
        let identity = state.user().map(|user| user.id.clone());
        let mut loaded_for = self.loaded_for.lock().await;
        if identity.is_some() && *loaded_for == identity {
            return;
        }
        debug!(user_id = ?identity, "Identity changed, reloading stores");

        let (cart, wishlist, orders) = tokio::join!(
            self.cart.on_identity_change(state),
            self.wishlist.on_identity_change(state),
            self.orders.on_identity_change(state),
        );
        // A failed reload must not leave the previous user's data behind
        if let Err(e) = cart {
            warn!(error = %e, "Failed to load cart");
            self.cart.clear_local().await;
        }
        if let Err(e) = wishlist {
            warn!(error = %e, "Failed to load wishlist");
            self.wishlist.clear_local().await;
        }
        if let Err(e) = orders {
            warn!(error = %e, "Failed to load orders");
            self.orders.clear_local().await;
        }
        *loaded_for = identity;
    }
}

impl Storefront {
    /// Build the context. Nothing is fetched until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, storage: SessionStorage) -> Result<Self> {
        let api = ApiClient::new(config)?;
        let session = SessionStore::new(api.clone(), storage);
        let cart = CartStore::new(api.clone(), session.clone());
        let wishlist = WishlistStore::new(api.clone(), session.clone());
        let orders = OrderStore::new(api.clone(), session.clone(), config.delivery_retry);

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                api,
                session,
                stores: Dependents {
                    cart,
                    wishlist,
                    orders,
                    loaded_for: Arc::new(Mutex::new(None)),
                },
                assets: AssetResolver::new(config.asset_origin.clone()),
                token_sync: OnceLock::new(),
                identity_sync: OnceLock::new(),
            }),
        })
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.stores.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.stores.wishlist
    }

    #[must_use]
    pub fn orders(&self) -> &OrderStore {
        &self.inner.stores.orders
    }

    #[must_use]
    pub fn assets(&self) -> &AssetResolver {
        &self.inner.assets
    }

    /// Restore the persisted session and load the dependent stores.
    ///
    /// Also starts persisting tokens rotated by the API client's silent
    /// refresh, and keeps the dependent stores following the session from
    /// then on. Safe to call more than once.
    #[instrument(skip(self))]
    pub async fn start(&self) -> SessionState {
        self.inner.token_sync.get_or_init(|| self.spawn_token_sync());
        self.inner
            .identity_sync
            .get_or_init(|| self.spawn_identity_sync());

        let state = self.inner.session.restore().await;
        self.inner.stores.follow(&state).await;
        state
    }

    fn spawn_token_sync(&self) -> TaskHandle {
        let mut refreshed = self.inner.api.subscribe_refreshes();
        let session = self.inner.session.clone();
        TaskHandle::new(tokio::spawn(async move {
            while refreshed.changed().await.is_ok() {
                session.persist_refreshed_token().await;
            }
        }))
    }

    fn spawn_identity_sync(&self) -> TaskHandle {
        let mut identity = self.inner.session.subscribe();
        let stores = self.inner.stores.clone();
        TaskHandle::new(tokio::spawn(async move {
            while identity.changed().await.is_ok() {
                let state = identity.borrow_and_update().clone();
                stores.follow(&state).await;
            }
        }))
    }

    /// Whether the background task that keeps the stores on the current
    /// identity is running.
    #[must_use]
    pub fn is_following_session(&self) -> bool {
        self.inner
            .identity_sync
            .get()
            .is_some_and(TaskHandle::is_running)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Sign in, then load the user's profile and stores.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a malformed form, or
    /// `ClientError::Api` if the credentials or the profile fetch are
    /// rejected. A failed profile fetch leaves the session anonymous.
    #[instrument(skip(self, form), fields(email = %form.email.trim()))]
    pub async fn login(&self, form: &LoginForm) -> Result<User> {
        form.validate()?;

        let password = SecretString::from(form.password.clone());
        self.inner.api.login(form.email.trim(), &password).await?;

        let profile = match self.inner.api.profile().await {
            Ok(profile) => profile,
            Err(e) => {
                self.inner.session.clear_local().await;
                self.inner.stores.follow(&SessionState::Anonymous).await;
                return Err(e.into());
            }
        };
        self.inner.session.set_user(profile).await?;

        let state = self.inner.session.state();
        self.inner.stores.follow(&state).await;
        info!("Signed in");
        self.require_user()
    }

    /// Start a registration; the backend emails a verification code.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for the first problem with the form,
    /// or `ClientError::Api` if the backend refuses (e.g. email taken).
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: &RegisterForm) -> Result<Acknowledgement> {
        let email = form.validate()?;
        let password = SecretString::from(form.password.clone());
        let ack = self
            .inner
            .api
            .register(form.username.trim(), &email, &password)
            .await?;
        Ok(ack)
    }

    /// Complete a registration with the emailed code.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if either field is blank, or
    /// `ClientError::Api` if the code is rejected.
    #[instrument(skip(self, otp))]
    pub async fn verify_registration(&self, email: &str, otp: &str) -> Result<Acknowledgement> {
        let (email, otp) = (email.trim(), otp.trim());
        if email.is_empty() {
            return Err(ValidationErrors::from(ValidationError::Required("Email")).into());
        }
        if otp.is_empty() {
            return Err(ValidationErrors::from(ValidationError::Required("Verification code")).into());
        }
        Ok(self.inner.api.verify_registration(email, otp).await?)
    }

    /// Sign out. Session, cart, wishlist and orders are cleared locally even
    /// when the backend call fails.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the backend logout failed.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let result = self.inner.session.logout().await;
        self.inner.stores.follow(&SessionState::Anonymous).await;
        result
    }

    /// Replace the profile image.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` when signed out, or
    /// `ClientError::Api` if the upload fails.
    #[instrument(skip(self, image), fields(file_name = %image.file_name))]
    pub async fn upload_profile_image(&self, image: ImageUpload) -> Result<User> {
        self.require_user()?;
        let user = self.inner.api.upload_profile_image(image).await?;
        self.inner.session.set_user(user).await?;
        self.require_user()
    }

    /// Remove the profile image.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` when signed out, or
    /// `ClientError::Api` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn delete_profile_image(&self) -> Result<User> {
        self.require_user()?;
        let user = self.inner.api.delete_profile_image().await?;
        self.inner.session.set_user(user).await?;
        self.require_user()
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Listing for a category, filtered and sorted client-side.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog cannot be fetched.
    pub async fn products(&self, query: &ProductQuery, filter: &ListingFilter) -> Result<Vec<Product>> {
        let products = self.inner.api.products(query).await?;
        Ok(filter.apply(&products))
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the product cannot be fetched.
    pub async fn product(&self, id: &ProductId) -> Result<Product> {
        Ok(self.inner.api.product(id).await?)
    }

    // =========================================================================
    // Cart & Wishlist
    // =========================================================================

    /// Add the selected variant to the cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` when signed out,
    /// `ClientError::NoVariantSelected` or `ClientError::OutOfStock` for an
    /// unusable selection, or `ClientError::Api` if the backend refuses.
    #[instrument(skip(self, selection))]
    pub async fn add_to_cart(&self, selection: &VariantSelection, quantity: u32) -> Result<Cart> {
        self.require_user()?;
        let key = selection.checked_line()?;
        self.inner.stores.cart.add(&key, quantity.max(1)).await
    }

    /// Like or unlike a product. Returns whether it is now in the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` when signed out, or
    /// `ClientError::Api` if the backend call fails.
    pub async fn toggle_wishlist(&self, id: &ProductId) -> Result<bool> {
        self.require_user()?;
        self.inner.stores.wishlist.toggle(id).await
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Totals for the current cart.
    pub async fn checkout_summary(&self) -> CheckoutSummary {
        CheckoutSummary::for_cart(&self.inner.stores.cart.cart().await)
    }

    /// Place an order for the current cart.
    ///
    /// On success the local cart is emptied and the orders are refetched.
    /// Cached catalog entries are dropped as well, since stock moved.
    /// Returns the created order when the backend echoes it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` when signed out,
    /// `ClientError::EmptyCart`, `ClientError::Validation` listing every
    /// blank address field, or `ClientError::Api` if the backend refuses.
    #[instrument(skip(self, address), fields(city = %address.city.trim()))]
    pub async fn place_order(&self, address: &ShippingAddress) -> Result<Option<Order>> {
        self.require_user()?;
        if self.inner.stores.cart.cart().await.is_empty() {
            return Err(ClientError::EmptyCart);
        }
        validate_shipping(address)?;

        let order = self.inner.api.place_order(&address.trimmed()).await?;
        info!(order_id = ?order.as_ref().map(|o| o.id.to_string()), "Order placed");

        self.inner.api.invalidate_catalog();
        self.inner.stores.cart.clear_local().await;
        if let Err(e) = self.inner.stores.orders.refresh().await {
            warn!(error = %e, "Failed to refresh orders after checkout");
        }
        Ok(order)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Create the user's review, or edit it if one exists. Returns the
    /// product as the backend now has it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` when signed out,
    /// `ClientError::Validation` for a bad rating or blank comment, or
    /// `ClientError::Api` if the backend refuses.
    #[instrument(skip(self, form), fields(product_id = %product_id))]
    pub async fn submit_review(&self, product_id: &ProductId, form: &ReviewForm) -> Result<Product> {
        let user = self.require_user()?;
        form.validate()?;

        let input = ReviewInput {
            rating: form.rating,
            comment: form.comment.trim().to_string(),
        };
        let product = self.inner.api.product_fresh(product_id).await?;
        match product.review_by(&user.id) {
            Some(existing) => {
                debug!(review_id = %existing.id, "Editing existing review");
                self.inner
                    .api
                    .update_review(product_id, &existing.id, &input)
                    .await?;
            }
            None => {
                self.inner.api.create_review(product_id, &input).await?;
            }
        }
        Ok(self.inner.api.product_fresh(product_id).await?)
    }

    /// Delete the user's review of a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` when signed out,
    /// `ClientError::NotFound` if the user has not reviewed the product, or
    /// `ClientError::Api` if the backend call fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_review(&self, product_id: &ProductId) -> Result<Product> {
        let user = self.require_user()?;
        let product = self.inner.api.product_fresh(product_id).await?;
        let review = product
            .review_by(&user.id)
            .ok_or_else(|| ClientError::NotFound(format!("review on {}", product_id.short())))?;
        self.inner.api.delete_review(product_id, &review.id).await?;
        Ok(self.inner.api.product_fresh(product_id).await?)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Every order in the store.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` or `ClientError::Forbidden`
    /// for non-admins, or `ClientError::Api` if the fetch fails.
    #[instrument(skip(self))]
    pub async fn admin_orders(&self) -> Result<AdminOrderBoard> {
        self.require_admin()?;
        Ok(AdminOrderBoard::new(self.inner.api.admin_orders().await?))
    }

    /// Mark an order delivered, on the backend and then on `board`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Forbidden` for non-admins,
    /// `ClientError::StatusTransition` if the order is already final, or
    /// `ClientError::Api` if the backend refuses.
    #[instrument(skip(self, board), fields(order_id = %id))]
    pub async fn admin_deliver(&self, board: &mut AdminOrderBoard, id: &OrderId) -> Result<Order> {
        self.require_admin()?;
        board.check_transition(id, OrderStatus::Delivered)?;
        self.inner.api.mark_order_delivered(id).await?;
        Ok(board.apply_status(id, OrderStatus::Delivered)?.clone())
    }

    /// Cancel an order, on the backend and then on `board`.
    ///
    /// # Errors
    ///
    /// Same as [`admin_deliver`](Self::admin_deliver).
    #[instrument(skip(self, board), fields(order_id = %id))]
    pub async fn admin_cancel(&self, board: &mut AdminOrderBoard, id: &OrderId) -> Result<Order> {
        self.require_admin()?;
        board.check_transition(id, OrderStatus::Cancelled)?;
        self.inner.api.cancel_order(id).await?;
        Ok(board.apply_status(id, OrderStatus::Cancelled)?.clone())
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Forbidden` for non-admins,
    /// `ClientError::Validation` listing every form problem, or
    /// `ClientError::Api` if the backend refuses.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn admin_create_product(&self, form: &ProductForm) -> Result<Option<Product>> {
        self.require_admin()?;
        form.validate(true)?;
        Ok(self.inner.api.create_product(form).await?)
    }

    /// Update a product. New images are optional.
    ///
    /// # Errors
    ///
    /// Same as [`admin_create_product`](Self::admin_create_product).
    #[instrument(skip(self, form), fields(product_id = %id))]
    pub async fn admin_update_product(&self, id: &ProductId, form: &ProductForm) -> Result<Option<Product>> {
        self.require_admin()?;
        form.validate(false)?;
        Ok(self.inner.api.update_product(id, form).await?)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Forbidden` for non-admins, or
    /// `ClientError::Api` if the backend refuses.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn admin_delete_product(&self, id: &ProductId) -> Result<()> {
        self.require_admin()?;
        Ok(self.inner.api.delete_product(id).await?)
    }

    // =========================================================================
    // Guards
    // =========================================================================

    fn require_user(&self) -> Result<User> {
        self.inner
            .session
            .user()
            .ok_or(ClientError::NotAuthenticated)
    }

    fn require_admin(&self) -> Result<User> {
        let user = self.require_user()?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(ClientError::Forbidden)
        }
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("session", &self.inner.session.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn storefront() -> Storefront {
        let config =
            ClientConfig::for_backend("http://127.0.0.1:9/api", PathBuf::from("unused")).unwrap();
        Storefront::new(&config, SessionStorage::memory()).unwrap()
    }

    fn customer(role: &str) -> User {
        serde_json::from_value(serde_json::json!({
            "_id": "U1", "username": "asha", "email": "asha@example.com", "role": role
        }))
        .unwrap()
    }

    fn product() -> Product {
        serde_json::from_value(serde_json::json!({
            "_id": "P1", "name": "Runner", "price": 500,
            "variants": [{"size": "M", "color": "Blue", "stock": 3}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_guest_cannot_add_to_cart() {
        let storefront = storefront();
        let selection = VariantSelection::new(&product());
        let result = storefront.add_to_cart(&selection, 1).await;
        assert!(matches!(result, Err(ClientError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_checkout_with_empty_cart_is_rejected_before_request() {
        let storefront = storefront();
        storefront.session().set_user(customer("customer")).await.unwrap();

        let address = ShippingAddress {
            address: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            postal_code: "411001".to_string(),
            country: "India".to_string(),
        };
        let result = storefront.place_order(&address).await;
        assert!(matches!(result, Err(ClientError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_admin_actions_need_admin_role() {
        let storefront = storefront();
        assert!(matches!(
            storefront.admin_orders().await,
            Err(ClientError::NotAuthenticated)
        ));

        storefront.session().set_user(customer("customer")).await.unwrap();
        assert!(matches!(
            storefront.admin_delete_product(&ProductId::new("P1")).await,
            Err(ClientError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_verify_requires_both_fields() {
        let storefront = storefront();
        let err = storefront.verify_registration(" ", "123456").await.unwrap_err();
        assert_eq!(err.to_string(), "Email is required");
        let err = storefront.verify_registration("a@b.co", "").await.unwrap_err();
        assert_eq!(err.to_string(), "Verification code is required");
    }

    #[tokio::test]
    async fn test_start_follows_session() {
        let storefront = storefront();
        assert!(!storefront.is_following_session());

        let state = storefront.start().await;
        assert!(matches!(state, SessionState::Anonymous));
        assert!(storefront.is_following_session());

        // A second start keeps the same task
        storefront.start().await;
        assert!(storefront.is_following_session());
    }

    #[tokio::test]
    async fn test_logout_clears_local_state_when_backend_is_down() {
        let storefront = storefront();
        storefront.session().set_user(customer("customer")).await.unwrap();

        let result = storefront.logout().await;

        assert!(matches!(result, Err(ClientError::Api(_))));
        assert!(!storefront.session().is_authenticated());
        assert!(storefront.cart().cart().await.is_empty());
        assert!(storefront.orders().orders().await.is_empty());
    }
}
