//! Cart and wishlist against the backend.

use sole_society_client::validation::LoginForm;
use sole_society_client::views::VariantSelection;
use sole_society_client::{ApiError, ClientError, Storefront};
use sole_society_core::{LineKey, Price, ProductId};
use sole_society_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, CUSTOMER_EMAIL, CUSTOMER_PASSWORD, FakeBackend,
};

async fn signed_in(backend: &FakeBackend) -> Storefront {
    let storefront = backend.storefront().await;
    storefront
        .login(&LoginForm {
            email: CUSTOMER_EMAIL.to_string(),
            password: CUSTOMER_PASSWORD.to_string(),
        })
        .await
        .expect("login");
    storefront
}

fn red_m() -> LineKey {
    LineKey::new(ProductId::new("P1"), "M", "Red")
}

#[tokio::test]
async fn test_mirror_matches_backend_after_each_mutation() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;

    let cart = storefront.cart().add(&red_m(), 2).await.expect("add");
    assert_eq!(cart.item_count(), 2);
    assert_eq!(cart.subtotal(), Price::from_rupees(1000));
    assert_eq!(
        backend.cart_lines().await,
        vec![("P1".to_string(), "M".to_string(), "Red".to_string(), 2)]
    );

    storefront.cart().set_quantity(&red_m(), 4).await.expect("set");
    assert_eq!(storefront.cart().item_count().await, 4);
    assert_eq!(backend.cart_lines().await[0].3, 4);

    let cart = storefront.cart().remove(&red_m()).await.expect("remove");
    assert!(cart.is_empty());
    assert!(backend.cart_lines().await.is_empty());
}

#[tokio::test]
async fn test_add_through_variant_selection() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    let product = storefront.product(&ProductId::new("P1")).await.expect("product");

    let mut selection = VariantSelection::new(&product);
    assert_eq!(selection.size(), Some("M"));
    assert_eq!(selection.color(), Some("Red"));

    selection.select_size("L").expect("size");
    selection.select_color("Black").expect("color");
    let err = storefront.add_to_cart(&selection, 1).await.expect_err("sold out");
    assert!(matches!(err, ClientError::OutOfStock));

    selection.select_size("M").expect("size");
    selection.select_color("Red").expect("color");
    let cart = storefront.add_to_cart(&selection, 0).await.expect("add");
    assert_eq!(cart.line(&red_m()).map(|l| l.quantity), Some(1));
    assert!(selection.in_cart(&cart));
}

#[tokio::test]
async fn test_decrement_at_one_sends_nothing() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    storefront.cart().add(&red_m(), 1).await.expect("add");
    backend.clear_requests().await;

    let cart = storefront.cart().decrement(&red_m()).await.expect("decrement");

    assert_eq!(cart.line(&red_m()).map(|l| l.quantity), Some(1));
    assert_eq!(backend.count("PUT /api/cart").await, 0);
}

#[tokio::test]
async fn test_stock_limit_surfaces_backend_message() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    let blue = LineKey::new(ProductId::new("P1"), "M", "Blue");
    storefront.cart().add(&blue, 3).await.expect("add");

    let err = storefront.cart().increment(&blue).await.expect_err("over stock");

    match err {
        ClientError::Api(ApiError::Status { message, .. }) => {
            assert_eq!(message, "Only 3 left in stock");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(storefront.cart().cart().await.line(&blue).map(|l| l.quantity), Some(3));
}

#[tokio::test]
async fn test_concurrent_increments_are_serialized() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    storefront.cart().add(&red_m(), 1).await.expect("add");

    let key = red_m();
    let (a, b) = tokio::join!(
        storefront.cart().increment(&key),
        storefront.cart().increment(&key),
    );
    a.expect("first");
    b.expect("second");

    assert_eq!(storefront.cart().item_count().await, 3);
    assert_eq!(backend.cart_lines().await[0].3, 3);
}

#[tokio::test]
async fn test_increment_missing_line_is_not_found() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;

    let err = storefront.cart().increment(&red_m()).await.expect_err("no line");
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn test_wishlist_toggle() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    let p2 = ProductId::new("P2");

    assert!(storefront.toggle_wishlist(&p2).await.expect("like"));
    assert!(storefront.wishlist().contains(&p2).await);
    assert_eq!(storefront.wishlist().wishlist().await.len(), 1);

    assert!(!storefront.toggle_wishlist(&p2).await.expect("unlike"));
    assert!(storefront.wishlist().wishlist().await.is_empty());
    assert_eq!(backend.count("DELETE /api/wishlist/P2").await, 1);
}

#[tokio::test]
async fn test_guest_wishlist_requires_login() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront().await;

    let err = storefront
        .toggle_wishlist(&ProductId::new("P2"))
        .await
        .expect_err("guest");
    assert!(matches!(err, ClientError::NotAuthenticated));
    assert!(backend.requests().await.is_empty());
}

#[tokio::test]
async fn test_cart_with_deleted_product_still_loads() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    storefront.cart().add(&red_m(), 2).await.expect("add runner");
    storefront
        .cart()
        .add(&LineKey::new(ProductId::new("P2"), "9", "White"), 1)
        .await
        .expect("add canvas");

    let admin = backend.storefront().await;
    admin
        .login(&LoginForm {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        })
        .await
        .expect("admin login");
    admin
        .admin_delete_product(&ProductId::new("P1"))
        .await
        .expect("delete");

    let cart = storefront.cart().refresh().await.expect("cart still loads");
    assert_eq!(cart.items.len(), 2);
    let gone = cart.line(&red_m()).expect("deleted line kept");
    assert!(!gone.product.is_available());
    assert_eq!(gone.line_total(), Price::ZERO);
    assert_eq!(cart.subtotal(), Price::from_rupees(350));
    assert_eq!(storefront.checkout_summary().await.subtotal, Price::from_rupees(350));

    let cart = storefront.cart().remove(&red_m()).await.expect("remove dead line");
    assert_eq!(cart.items.len(), 1);
}
