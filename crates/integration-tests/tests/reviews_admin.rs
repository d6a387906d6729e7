//! Reviews and admin operations.

use rust_decimal::Decimal;
use sole_society_client::validation::{LoginForm, ProductForm, ReviewForm, VariantInput};
use sole_society_client::{ClientError, ImageUpload, Storefront};
use sole_society_core::{LineKey, OrderStatus, ProductId, ShippingAddress};
use sole_society_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, CUSTOMER_EMAIL, CUSTOMER_PASSWORD, FakeBackend,
};

async fn signed_in(backend: &FakeBackend, email: &str, password: &str) -> Storefront {
    let storefront = backend.storefront().await;
    storefront
        .login(&LoginForm {
            email: email.to_string(),
            password: password.to_string(),
        })
        .await
        .expect("login");
    storefront
}

async fn customer(backend: &FakeBackend) -> Storefront {
    signed_in(backend, CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await
}

async fn admin(backend: &FakeBackend) -> Storefront {
    signed_in(backend, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

async fn place_order(storefront: &Storefront) -> sole_society_core::Order {
    storefront
        .cart()
        .add(&LineKey::new(ProductId::new("P2"), "9", "White"), 1)
        .await
        .expect("add");
    storefront
        .place_order(&ShippingAddress {
            address: "4 Park Street".to_string(),
            city: "Kolkata".to_string(),
            postal_code: "700016".to_string(),
            country: "India".to_string(),
        })
        .await
        .expect("placed")
        .expect("echoed")
}

fn product_form() -> ProductForm {
    ProductForm {
        name: "Trail Blazer".to_string(),
        brand: "Sole".to_string(),
        category: "men".to_string(),
        kind: "sneakers".to_string(),
        description: "Grippy outsole".to_string(),
        price: Decimal::from(1200),
        variants: vec![
            VariantInput {
                size: "8".to_string(),
                color: "Grey".to_string(),
                stock: 4,
            },
            VariantInput {
                size: " 9 ".to_string(),
                color: "Grey".to_string(),
                stock: 0,
            },
        ],
        images: vec![
            ImageUpload::new("front.jpg", "image/jpeg", vec![0xff, 0xd8]),
            ImageUpload::new("side.jpg", "image/jpeg", vec![0xff, 0xd8]),
        ],
        ..ProductForm::default()
    }
}

// =============================================================================
// Reviews
// =============================================================================

#[tokio::test]
async fn test_second_submit_edits_instead_of_duplicating() {
    let backend = FakeBackend::start().await;
    let storefront = customer(&backend).await;
    let p2 = ProductId::new("P2");

    let product = storefront
        .submit_review(&p2, &ReviewForm {
            rating: 4,
            comment: "Comfortable".to_string(),
        })
        .await
        .expect("create");
    assert_eq!(product.reviews.len(), 1);

    let product = storefront
        .submit_review(&p2, &ReviewForm {
            rating: 2,
            comment: "Wore out fast".to_string(),
        })
        .await
        .expect("edit");

    assert_eq!(product.reviews.len(), 1);
    assert_eq!(product.reviews[0].rating, 2);
    assert_eq!(product.reviews[0].comment, "Wore out fast");
    assert!((product.rating - 2.0).abs() < f64::EPSILON);
    assert_eq!(backend.count("POST /api/products/P2/reviews").await, 1);
    assert_eq!(backend.count("PUT /api/products/P2/reviews/R000001").await, 1);
}

#[tokio::test]
async fn test_delete_review() {
    let backend = FakeBackend::start().await;
    let storefront = customer(&backend).await;
    let p2 = ProductId::new("P2");

    let err = storefront.delete_review(&p2).await.expect_err("nothing to delete");
    assert!(matches!(err, ClientError::NotFound(_)));

    storefront
        .submit_review(&p2, &ReviewForm {
            rating: 5,
            comment: "Great".to_string(),
        })
        .await
        .expect("create");
    let product = storefront.delete_review(&p2).await.expect("delete");
    assert!(product.reviews.is_empty());
}

#[tokio::test]
async fn test_invalid_review_is_not_sent() {
    let backend = FakeBackend::start().await;
    let storefront = customer(&backend).await;
    backend.clear_requests().await;

    let err = storefront
        .submit_review(&ProductId::new("P2"), &ReviewForm {
            rating: 0,
            comment: "  ".to_string(),
        })
        .await
        .expect_err("invalid");

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(backend.requests().await.is_empty());
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_customer_cannot_use_admin_operations() {
    let backend = FakeBackend::start().await;
    let storefront = customer(&backend).await;
    backend.clear_requests().await;

    assert!(matches!(
        storefront.admin_orders().await,
        Err(ClientError::Forbidden)
    ));
    assert!(matches!(
        storefront.admin_create_product(&product_form()).await,
        Err(ClientError::Forbidden)
    ));
    assert!(backend.requests().await.is_empty());
}

#[tokio::test]
async fn test_admin_delivers_and_cannot_reverse() {
    let backend = FakeBackend::start().await;
    let shopper = customer(&backend).await;
    let order = place_order(&shopper).await;

    let storefront = admin(&backend).await;
    let mut board = storefront.admin_orders().await.expect("board");
    assert_eq!(board.pending().count(), 1);
    let listed = board.get(&order.id).expect("listed");
    assert_eq!(listed.user.as_ref().map(|u| u.username.as_str()), Some("asha"));

    let delivered = storefront
        .admin_deliver(&mut board, &order.id)
        .await
        .expect("deliver");
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert_eq!(board.pending().count(), 0);
    assert_eq!(backend.order_status(order.id.as_str()).await.as_deref(), Some("Delivered"));

    backend.clear_requests().await;
    let err = storefront
        .admin_cancel(&mut board, &order.id)
        .await
        .expect_err("already delivered");
    assert!(matches!(err, ClientError::StatusTransition(_)));
    assert!(backend.requests().await.is_empty());
}

#[tokio::test]
async fn test_admin_cancels_pending_order() {
    let backend = FakeBackend::start().await;
    let shopper = customer(&backend).await;
    let order = place_order(&shopper).await;

    let storefront = admin(&backend).await;
    let mut board = storefront.admin_orders().await.expect("board");
    let cancelled = storefront
        .admin_cancel(&mut board, &order.id)
        .await
        .expect("cancel");

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(backend.order_status(order.id.as_str()).await.as_deref(), Some("Cancelled"));
}

#[tokio::test]
async fn test_admin_creates_product_as_multipart() {
    let backend = FakeBackend::start().await;
    let storefront = admin(&backend).await;

    let product = storefront
        .admin_create_product(&product_form())
        .await
        .expect("create")
        .expect("echoed");

    assert_eq!(product.name, "Trail Blazer");
    assert_eq!(product.kind, "sneakers");
    assert_eq!(product.variants.len(), 2);
    assert_eq!(product.images.len(), 2);

    let (fields, files) = backend.last_product_upload().await.expect("upload");
    assert_eq!(files, 2);
    assert_eq!(fields.get("price").map(String::as_str), Some("1200"));
    let variants: serde_json::Value =
        serde_json::from_str(fields.get("variants").expect("variants")).expect("json");
    assert_eq!(
        variants,
        serde_json::json!([
            {"size": "8", "color": "Grey", "stock": 4},
            {"size": "9", "color": "Grey", "stock": 0}
        ])
    );

    let listed = storefront
        .products(&Default::default(), &Default::default())
        .await
        .expect("listing");
    assert!(listed.iter().any(|p| p.id == product.id));
}

#[tokio::test]
async fn test_product_without_images_is_rejected_locally() {
    let backend = FakeBackend::start().await;
    let storefront = admin(&backend).await;
    backend.clear_requests().await;

    let form = ProductForm {
        images: Vec::new(),
        ..product_form()
    };
    let err = storefront
        .admin_create_product(&form)
        .await
        .expect_err("no images");

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(backend.requests().await.is_empty());
}

#[tokio::test]
async fn test_review_refreshes_cached_listing_rating() {
    let backend = FakeBackend::start().await;
    let storefront = customer(&backend).await;
    let p2 = ProductId::new("P2");

    let listed = storefront
        .products(&Default::default(), &Default::default())
        .await
        .expect("listing");
    let before = listed.iter().find(|p| p.id == p2).expect("listed");
    assert!(before.rating.abs() < f64::EPSILON);

    storefront
        .submit_review(&p2, &ReviewForm {
            rating: 4,
            comment: "Comfortable".to_string(),
        })
        .await
        .expect("review");

    let listed = storefront
        .products(&Default::default(), &Default::default())
        .await
        .expect("listing");
    let after = listed.iter().find(|p| p.id == p2).expect("listed");
    assert!((after.rating - 4.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_fractional_discount_reaches_listing() {
    let backend = FakeBackend::start().await;
    let storefront = admin(&backend).await;

    let form = ProductForm {
        original_price: Some(Decimal::from(1600)),
        discount: Decimal::new(125, 1),
        ..product_form()
    };
    let product = storefront
        .admin_create_product(&form)
        .await
        .expect("create")
        .expect("echoed");
    let (fields, _) = backend.last_product_upload().await.expect("upload");
    assert_eq!(fields.get("discount").map(String::as_str), Some("12.5"));

    let shopper = customer(&backend).await;
    let listed = shopper
        .products(&Default::default(), &Default::default())
        .await
        .expect("listing decodes");
    let created = listed.iter().find(|p| p.id == product.id).expect("listed");
    assert_eq!(created.discount, Decimal::new(125, 1));
}
