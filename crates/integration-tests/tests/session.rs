//! Session restore, profile and logout.

use std::time::Duration;

use sole_society_client::validation::{LoginForm, RegisterForm};
use sole_society_client::{ClientError, SessionState, SessionStorage, Storefront};
use sole_society_core::{LineKey, ProductId, Role};
use sole_society_integration_tests::{CUSTOMER_EMAIL, CUSTOMER_PASSWORD, FakeBackend};

fn customer() -> LoginForm {
    LoginForm {
        email: CUSTOMER_EMAIL.to_string(),
        password: CUSTOMER_PASSWORD.to_string(),
    }
}

fn file_storage(dir: &tempfile::TempDir) -> SessionStorage {
    SessionStorage::file(dir.path().join("session.json"))
}

#[tokio::test]
async fn test_login_then_restore_in_new_process() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let first = backend.storefront_with(file_storage(&dir)).await;
    let user = first.login(&customer()).await.expect("login");
    assert_eq!(user.username, "asha");
    assert_eq!(user.role, Role::Customer);
    drop(first);

    let config = backend.config(dir.path().join("session.json"));
    let second = Storefront::new(&config, file_storage(&dir)).expect("storefront");
    let state = second.start().await;

    let SessionState::Authenticated(user) = state else {
        panic!("expected restored session, got {state:?}");
    };
    assert_eq!(user.email, CUSTOMER_EMAIL);
}

#[tokio::test]
async fn test_revoked_session_restores_anonymous_and_is_forgotten() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let first = backend.storefront_with(file_storage(&dir)).await;
    first.login(&customer()).await.expect("login");
    drop(first);

    backend.expire_tokens().await;
    backend.set_refresh_allowed(false).await;

    let second = backend.storefront_with(file_storage(&dir)).await;
    assert!(matches!(second.session().state(), SessionState::Anonymous));
    assert!(file_storage(&dir).load().await.expect("load").is_none());
}

#[tokio::test]
async fn test_logout_clears_everything_even_when_backend_fails() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let storefront = backend.storefront_with(file_storage(&dir)).await;
    storefront.login(&customer()).await.expect("login");
    storefront
        .cart()
        .add(&LineKey::new(ProductId::new("P1"), "M", "Red"), 1)
        .await
        .expect("add");

    backend.set_fail_logout(true).await;
    let result = storefront.logout().await;

    assert!(matches!(result, Err(ClientError::Api(_))));
    assert!(!storefront.session().is_authenticated());
    assert!(storefront.cart().cart().await.is_empty());
    assert!(!storefront.api().has_token().await);
    assert!(file_storage(&dir).load().await.expect("load").is_none());
}

#[tokio::test]
async fn test_identity_change_loads_stores() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront().await;
    assert!(storefront.cart().cart().await.is_empty());

    storefront.login(&customer()).await.expect("login");
    storefront
        .cart()
        .add(&LineKey::new(ProductId::new("P2"), "9", "White"), 2)
        .await
        .expect("add");

    // A second client for the same user sees the server cart after login
    let other = backend.storefront().await;
    other.login(&customer()).await.expect("login");
    assert_eq!(other.cart().item_count().await, 2);
}

#[tokio::test]
async fn test_register_and_verify() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront().await;

    let form = RegisterForm {
        username: "meera".to_string(),
        email: "meera@example.com".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
    };
    let ack = storefront.register(&form).await.expect("register");
    assert_eq!(ack.message.as_deref(), Some("OTP sent to your email"));

    let err = storefront
        .verify_registration("meera@example.com", "000000")
        .await
        .expect_err("wrong code");
    assert_eq!(err.to_string(), "Invalid or expired OTP (HTTP 400 Bad Request)");

    storefront
        .verify_registration("meera@example.com", " 123456 ")
        .await
        .expect("verified");
}

#[tokio::test]
async fn test_register_mismatch_is_caught_locally() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront().await;

    let form = RegisterForm {
        username: "meera".to_string(),
        email: "meera@example.com".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret2".to_string(),
    };
    let err = storefront.register(&form).await.expect_err("mismatch");
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(backend.requests().await.is_empty());
}

#[tokio::test]
async fn test_profile_image_round_trip() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront().await;
    storefront.login(&customer()).await.expect("login");

    let image = sole_society_client::ImageUpload::new("me.png", "image/png", vec![1, 2, 3]);
    let user = storefront.upload_profile_image(image).await.expect("upload");
    assert_eq!(user.profile_image.as_deref(), Some("/uploads/me.png"));
    assert_eq!(
        storefront.assets().resolve(user.profile_image.as_deref()),
        format!("{}/uploads/me.png", backend.api_url().trim_end_matches("/api"))
    );

    let user = storefront.delete_profile_image().await.expect("delete");
    assert!(user.profile_image.is_none());
    assert!(storefront.api().has_token().await);
}

#[tokio::test]
async fn test_failed_profile_fetch_empties_stores() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront().await;
    storefront.login(&customer()).await.expect("login");
    storefront
        .cart()
        .add(&LineKey::new(ProductId::new("P1"), "M", "Red"), 2)
        .await
        .expect("add");
    storefront
        .wishlist()
        .add(&ProductId::new("P2"))
        .await
        .expect("like");

    backend.set_fail_profile(true).await;
    let err = storefront.login(&customer()).await.expect_err("profile down");

    assert!(matches!(err, ClientError::Api(_)));
    assert!(matches!(storefront.session().state(), SessionState::Anonymous));
    assert_eq!(storefront.cart().item_count().await, 0);
    assert!(storefront.wishlist().wishlist().await.is_empty());
    assert!(storefront.orders().orders().await.is_empty());
}

#[tokio::test]
async fn test_stores_follow_session_cleared_elsewhere() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront().await;
    assert!(storefront.is_following_session());
    storefront.login(&customer()).await.expect("login");
    storefront
        .cart()
        .add(&LineKey::new(ProductId::new("P1"), "M", "Red"), 2)
        .await
        .expect("add");
    backend.clear_requests().await;

    storefront.session().clear_local().await;

    let emptied = tokio::time::timeout(Duration::from_secs(2), async {
        while storefront.cart().item_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(emptied.is_ok(), "cart kept the signed-out user's lines");
    assert!(!storefront.session().is_authenticated());
    assert!(backend.requests().await.is_empty());
}

#[tokio::test]
async fn test_token_rotation_does_not_reload_stores() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront().await;
    storefront.login(&customer()).await.expect("login");

    backend.expire_tokens().await;
    backend.clear_requests().await;
    storefront.cart().refresh().await.expect("cart after refresh");
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Same user after the refresh, so only the retried call goes out
    assert_eq!(backend.count("GET /api/cart").await, 2);
    assert_eq!(backend.count("GET /api/wishlist").await, 0);
    assert_eq!(backend.count("GET /api/orders").await, 0);
}
