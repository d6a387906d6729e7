//! Integration tests for the Sole Society client.
//!
//! The tests drive the real `reqwest`-based client against [`FakeBackend`],
//! an in-process `axum` server speaking the storefront REST API on an
//! ephemeral port. Each test starts its own backend, so tests run in parallel
//! without sharing state.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sole-society-integration-tests
//! ```
//!
//! # Failure Switches
//!
//! The backend can be told to expire every issued token, refuse refreshes,
//! fail logout or profile fetches, or stop acknowledging delivery
//! confirmations, so that the client's recovery paths can be exercised.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use sole_society_client::{ClientConfig, SessionStorage, Storefront};

pub const CUSTOMER_EMAIL: &str = "asha@example.com";
pub const CUSTOMER_PASSWORD: &str = "sneakers";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-pass";

const SHIPPING_FEE: f64 = 99.0;
const DEFAULT_DELIVERY_DELAY: Duration = Duration::from_secs(300);

type Shared = Arc<Mutex<BackendState>>;
type HandlerResult = Result<Json<Value>, Response>;

// =============================================================================
// FakeBackend
// =============================================================================

/// In-process storefront backend.
///
/// The server task is aborted when the value is dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    task: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a backend seeded with a customer, an admin and two products.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState::seeded()));
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake backend");
        });

        Self { addr, state, task }
    }

    /// Base URL the client should use.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the URL is rejected, which would be a bug in the backend.
    #[must_use]
    pub fn config(&self, session_file: PathBuf) -> ClientConfig {
        let mut config =
            ClientConfig::for_backend(&self.api_url(), session_file).expect("valid backend url");
        config.asset_origin = format!("http://{}", self.addr)
            .parse()
            .expect("valid asset origin");
        config.delivery_retry = Duration::from_secs(30);
        config
    }

    /// A started storefront with in-memory session storage.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    pub async fn storefront(&self) -> Storefront {
        self.storefront_with(SessionStorage::memory()).await
    }

    /// A started storefront with the given session storage.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    pub async fn storefront_with(&self, storage: SessionStorage) -> Storefront {
        let config = self.config(PathBuf::from("unused"));
        let storefront = Storefront::new(&config, storage).expect("build storefront");
        storefront.start().await;
        storefront
    }

    // =========================================================================
    // Failure Switches
    // =========================================================================

    /// Invalidate every issued bearer token.
    pub async fn expire_tokens(&self) {
        self.state.lock().await.tokens.clear();
    }

    /// Whether `POST /auth/refresh` issues a new token.
    pub async fn set_refresh_allowed(&self, allowed: bool) {
        self.state.lock().await.refresh_allowed = allowed;
    }

    /// Make `POST /auth/logout` fail with 500.
    pub async fn set_fail_logout(&self, fail: bool) {
        self.state.lock().await.fail_logout = fail;
    }

    /// Make `GET /auth/profile` fail with 500.
    pub async fn set_fail_profile(&self, fail: bool) {
        self.state.lock().await.fail_profile = fail;
    }

    /// Make `PATCH /orders/:id` fail with 503.
    pub async fn set_fail_confirmations(&self, fail: bool) {
        self.state.lock().await.fail_confirmations = fail;
    }

    /// Delivery deadline given to new orders, counted from placement.
    pub async fn set_delivery_delay(&self, delay: Duration) {
        self.state.lock().await.delivery_delay = delay;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every request received, as `"METHOD /path"`, in arrival order.
    pub async fn requests(&self) -> Vec<String> {
        self.state.lock().await.requests.clone()
    }

    /// How many received requests match `"METHOD /path"` exactly.
    pub async fn count(&self, request: &str) -> usize {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| *r == request)
            .count()
    }

    /// Forget the request log.
    pub async fn clear_requests(&self) {
        self.state.lock().await.requests.clear();
    }

    /// Server-side cart as `(product, size, color, quantity)`.
    pub async fn cart_lines(&self) -> Vec<(String, String, String, u32)> {
        self.state
            .lock()
            .await
            .cart
            .iter()
            .map(|l| (l.product_id.clone(), l.size.clone(), l.color.clone(), l.quantity))
            .collect()
    }

    /// Text fields of the last multipart product submission and its file count.
    pub async fn last_product_upload(&self) -> Option<(HashMap<String, String>, usize)> {
        self.state.lock().await.last_upload.clone()
    }

    /// Server-side status of an order.
    pub async fn order_status(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .order(id)
            .and_then(|o| o["status"].as_str().map(str::to_string))
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// State
// =============================================================================

struct Account {
    password: &'static str,
    user: Value,
}

#[derive(Debug, Clone)]
struct CartLine {
    product_id: String,
    size: String,
    color: String,
    quantity: u32,
}

struct BackendState {
    accounts: HashMap<&'static str, Account>,
    /// Issued bearer tokens and the account email each belongs to.
    tokens: HashMap<String, String>,
    last_login: Option<String>,
    issued: u32,
    refresh_allowed: bool,
    fail_logout: bool,
    fail_profile: bool,
    fail_confirmations: bool,
    delivery_delay: Duration,
    products: Vec<Value>,
    cart: Vec<CartLine>,
    wishlist: Vec<String>,
    orders: Vec<Value>,
    next_id: u32,
    last_upload: Option<(HashMap<String, String>, usize)>,
    requests: Vec<String>,
}

impl BackendState {
    fn seeded() -> Self {
        let accounts = HashMap::from([
            (
                CUSTOMER_EMAIL,
                Account {
                    password: CUSTOMER_PASSWORD,
                    user: json!({
                        "_id": "U-customer", "username": "asha",
                        "email": CUSTOMER_EMAIL, "role": "customer"
                    }),
                },
            ),
            (
                ADMIN_EMAIL,
                Account {
                    password: ADMIN_PASSWORD,
                    user: json!({
                        "_id": "U-admin", "username": "ravi",
                        "email": ADMIN_EMAIL, "role": "admin"
                    }),
                },
            ),
        ]);

        let products = vec![
            json!({
                "_id": "P1", "name": "Street Runner", "brand": "Sole", "category": "sneakers",
                "type": "running", "price": 500, "originalPrice": 700, "discount": 28,
                "images": ["/uploads/p1.png"], "rating": 0, "reviews": [],
                "isFeatured": true, "isNewArrival": false,
                "variants": [
                    {"size": "M", "color": "Red", "stock": 10},
                    {"size": "M", "color": "Blue", "stock": 3},
                    {"size": "L", "color": "Black", "stock": 0}
                ]
            }),
            json!({
                "_id": "P2", "name": "Canvas Low", "brand": "Sole", "category": "casual",
                "type": "lifestyle", "price": 350, "images": [], "rating": 0, "reviews": 0,
                "isFeatured": false, "isNewArrival": true,
                "variants": [{"size": "9", "color": "White", "stock": 5}]
            }),
        ];

        Self {
            accounts,
            tokens: HashMap::new(),
            last_login: None,
            issued: 0,
            refresh_allowed: true,
            fail_logout: false,
            fail_profile: false,
            fail_confirmations: false,
            delivery_delay: DEFAULT_DELIVERY_DELAY,
            products,
            cart: Vec::new(),
            wishlist: Vec::new(),
            orders: Vec::new(),
            next_id: 0,
            last_upload: None,
            requests: Vec::new(),
        }
    }

    fn issue_token(&mut self, email: &str) -> String {
        self.issued += 1;
        let token = format!("token-{}", self.issued);
        self.tokens.insert(token.clone(), email.to_string());
        self.last_login = Some(email.to_string());
        token
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:06}", self.next_id)
    }

    /// Email of the bearer, or a 401 response.
    fn authorize(&self, headers: &HeaderMap) -> Result<String, Response> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| self.tokens.get(token))
            .cloned()
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Not authorized, token failed"))
    }

    fn authorize_admin(&self, headers: &HeaderMap) -> Result<String, Response> {
        let email = self.authorize(headers)?;
        let is_admin = self
            .accounts
            .get(email.as_str())
            .is_some_and(|a| a.user["role"] == "admin");
        if is_admin {
            Ok(email)
        } else {
            Err(error(StatusCode::FORBIDDEN, "Not authorized as an admin"))
        }
    }

    fn user(&self, email: &str) -> Value {
        self.accounts
            .get(email)
            .map_or(Value::Null, |a| a.user.clone())
    }

    fn product(&self, id: &str) -> Option<&Value> {
        self.products.iter().find(|p| p["_id"] == id)
    }

    fn product_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.products.iter_mut().find(|p| p["_id"] == id)
    }

    fn order(&self, id: &str) -> Option<&Value> {
        self.orders.iter().find(|o| o["_id"] == id)
    }

    fn take_stock(&mut self, line: &CartLine) {
        let variant = self
            .product_mut(&line.product_id)
            .and_then(|p| p["variants"].as_array_mut())
            .and_then(|variants| {
                variants
                    .iter_mut()
                    .find(|v| v["size"] == line.size.as_str() && v["color"] == line.color.as_str())
            });
        if let Some(variant) = variant {
            let left = variant["stock"]
                .as_u64()
                .unwrap_or(0)
                .saturating_sub(u64::from(line.quantity));
            variant["stock"] = json!(left);
        }
    }

    fn stock(&self, id: &str, size: &str, color: &str) -> Option<u64> {
        self.product(id)?["variants"]
            .as_array()?
            .iter()
            .find(|v| v["size"] == size && v["color"] == color)
            .and_then(|v| v["stock"].as_u64())
    }

    fn cart_json(&self) -> Value {
        let mut total = 0.0;
        let items: Vec<Value> = self
            .cart
            .iter()
            .map(|line| {
                let product = self.product(&line.product_id).cloned().unwrap_or(Value::Null);
                total += product["price"].as_f64().unwrap_or(0.0) * f64::from(line.quantity);
                json!({
                    "product": {
                        "_id": line.product_id,
                        "name": product["name"],
                        "price": product["price"],
                        "images": product["images"],
                    },
                    "quantity": line.quantity,
                    "size": line.size,
                    "color": line.color,
                })
            })
            .collect();
        json!({ "items": items, "total": total })
    }

    fn wishlist_json(&self) -> Value {
        Value::Array(
            self.wishlist
                .iter()
                .filter_map(|id| self.product(id).cloned())
                .collect(),
        )
    }

    fn line_index(&self, product_id: &str, size: &str, color: &str) -> Option<usize> {
        self.cart
            .iter()
            .position(|l| l.product_id == product_id && l.size == size && l.color == color)
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// Router
// =============================================================================

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/verify-register", post(verify_register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(profile))
        .route(
            "/auth/profile-image",
            put(upload_profile_image).delete(delete_profile_image),
        )
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", get(get_product).delete(delete_product))
        .route("/products/{id}/reviews", post(create_review))
        .route(
            "/products/{id}/reviews/{review_id}",
            put(update_review).delete(delete_review),
        )
        .route("/cart", get(get_cart).post(add_to_cart).put(update_cart))
        .route("/cart/{product}/{size}/{color}", delete(remove_from_cart))
        .route("/wishlist", get(get_wishlist).post(add_to_wishlist))
        .route("/wishlist/{product}", delete(remove_from_wishlist))
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/admin", get(admin_orders))
        .route("/orders/{id}", patch(confirm_delivery))
        .route("/orders/{id}/deliver", put(admin_deliver))
        .route("/orders/{id}/cancel", put(admin_cancel));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let entry = format!("{} {}", request.method(), request.uri().path());
    state.lock().await.requests.push(entry);
    next.run(request).await
}

// =============================================================================
// Auth Handlers
// =============================================================================

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<Credentials>) -> HandlerResult {
    let mut s = state.lock().await;
    let valid = s
        .accounts
        .get(body.email.as_str())
        .is_some_and(|a| a.password == body.password);
    if !valid {
        return Err(error(StatusCode::UNAUTHORIZED, "Invalid email or password"));
    }
    let token = s.issue_token(&body.email);
    let mut user = s.user(&body.email);
    user["token"] = json!(token);
    Ok(Json(user))
}

async fn register(Json(body): Json<Value>) -> HandlerResult {
    if body["email"] == CUSTOMER_EMAIL {
        return Err(error(StatusCode::BAD_REQUEST, "User already exists"));
    }
    Ok(Json(json!({ "message": "OTP sent to your email" })))
}

async fn verify_register(Json(body): Json<Value>) -> HandlerResult {
    if body["otp"] == "123456" {
        Ok(Json(json!({ "message": "Account verified" })))
    } else {
        Err(error(StatusCode::BAD_REQUEST, "Invalid or expired OTP"))
    }
}

async fn refresh(State(state): State<Shared>) -> HandlerResult {
    let mut s = state.lock().await;
    match s.last_login.clone() {
        Some(email) if s.refresh_allowed => {
            let token = s.issue_token(&email);
            Ok(Json(json!({ "token": token })))
        }
        _ => Err(error(StatusCode::UNAUTHORIZED, "Refresh token expired")),
    }
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> HandlerResult {
    let mut s = state.lock().await;
    if s.fail_logout {
        return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "Logout failed"));
    }
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        s.tokens.remove(token);
    }
    s.last_login = None;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> HandlerResult {
    let s = state.lock().await;
    let email = s.authorize(&headers)?;
    if s.fail_profile {
        return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "Profile unavailable"));
    }
    Ok(Json(s.user(&email)))
}

async fn upload_profile_image(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> HandlerResult {
    let email = state.lock().await.authorize(&headers)?;
    let mut file_name = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, &e.to_string()))?
    {
        if field.name() == Some("image") {
            file_name = field.file_name().map(str::to_string);
        }
    }
    let file_name = file_name.ok_or_else(|| error(StatusCode::BAD_REQUEST, "No image"))?;

    let mut s = state.lock().await;
    let account = s
        .accounts
        .get_mut(email.as_str())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "User not found"))?;
    account.user["profileImage"] = json!(format!("/uploads/{file_name}"));
    Ok(Json(account.user.clone()))
}

async fn delete_profile_image(State(state): State<Shared>, headers: HeaderMap) -> HandlerResult {
    let mut s = state.lock().await;
    let email = s.authorize(&headers)?;
    let account = s
        .accounts
        .get_mut(email.as_str())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "User not found"))?;
    if let Some(user) = account.user.as_object_mut() {
        user.remove("profileImage");
    }
    Ok(Json(account.user.clone()))
}

// =============================================================================
// Catalog Handlers
// =============================================================================

async fn list_products(
    State(state): State<Shared>,
    axum::extract::Query(query): axum::extract::Query<HashMap<String, String>>,
) -> HandlerResult {
    let s = state.lock().await;
    let products: Vec<Value> = s
        .products
        .iter()
        .filter(|p| query.get("category").is_none_or(|c| p["category"] == c.as_str()))
        .cloned()
        .collect();
    Ok(Json(Value::Array(products)))
}

async fn get_product(State(state): State<Shared>, Path(id): Path<String>) -> HandlerResult {
    let s = state.lock().await;
    s.product(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Product not found"))
}

async fn create_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> HandlerResult {
    state.lock().await.authorize_admin(&headers)?;

    let mut fields = HashMap::new();
    let mut images = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, &e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        if let Some(file_name) = file_name {
            images.push(format!("/uploads/{file_name}"));
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| error(StatusCode::BAD_REQUEST, &e.to_string()))?;
            fields.insert(name, text);
        }
    }

    let variants: Value = fields
        .get("variants")
        .and_then(|v| serde_json::from_str(v).ok())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "Invalid variants"))?;
    let price: f64 = fields
        .get("price")
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "Invalid price"))?;
    let discount: f64 = fields
        .get("discount")
        .and_then(|d| d.parse().ok())
        .unwrap_or(0.0);

    let mut s = state.lock().await;
    let id = s.next_id("P");
    let product = json!({
        "_id": id,
        "name": fields.get("name"),
        "brand": fields.get("brand"),
        "category": fields.get("category"),
        "type": fields.get("type"),
        "price": price,
        "discount": discount,
        "images": images,
        "variants": variants,
        "reviews": [],
        "isFeatured": fields.get("isFeatured").is_some_and(|v| v == "true"),
        "isNewArrival": fields.get("isNewArrival").is_some_and(|v| v == "true"),
    });
    s.products.push(product.clone());
    s.last_upload = Some((fields, images.len()));
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> HandlerResult {
    let mut s = state.lock().await;
    s.authorize_admin(&headers)?;
    s.products.retain(|p| p["_id"] != id.as_str());
    Ok(Json(json!({ "message": "Product removed" })))
}

#[derive(Deserialize)]
struct ReviewBody {
    rating: u8,
    comment: String,
}

async fn create_review(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReviewBody>,
) -> HandlerResult {
    let mut s = state.lock().await;
    let email = s.authorize(&headers)?;
    let user_id = s.user(&email)["_id"].clone();
    let review_id = s.next_id("R");
    let product = s
        .product_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Product not found"))?;

    // Listings may carry a review count instead of the list
    if !product["reviews"].is_array() {
        product["reviews"] = json!([]);
    }
    let already = product["reviews"]
        .as_array()
        .is_some_and(|r| r.iter().any(|r| r["user"] == user_id));
    if already {
        return Err(error(StatusCode::BAD_REQUEST, "Product already reviewed"));
    }
    if let Some(reviews) = product["reviews"].as_array_mut() {
        reviews.push(json!({
            "_id": review_id,
            "user": user_id,
            "rating": body.rating,
            "comment": body.comment,
        }));
    }
    recompute_rating(product);
    Ok(Json(json!({ "message": "Review added" })))
}

async fn update_review(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, review_id)): Path<(String, String)>,
    Json(body): Json<ReviewBody>,
) -> HandlerResult {
    let mut s = state.lock().await;
    let email = s.authorize(&headers)?;
    let user_id = s.user(&email)["_id"].clone();
    let product = s
        .product_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Product not found"))?;
    let review = product["reviews"]
        .as_array_mut()
        .and_then(|r| r.iter_mut().find(|r| r["_id"] == review_id.as_str()))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Review not found"))?;
    if review["user"] != user_id {
        return Err(error(StatusCode::FORBIDDEN, "Not your review"));
    }
    review["rating"] = json!(body.rating);
    review["comment"] = json!(body.comment);
    recompute_rating(product);
    Ok(Json(json!({ "message": "Review updated" })))
}

async fn delete_review(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, review_id)): Path<(String, String)>,
) -> HandlerResult {
    let mut s = state.lock().await;
    let email = s.authorize(&headers)?;
    let user_id = s.user(&email)["_id"].clone();
    let product = s
        .product_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Product not found"))?;
    let reviews = product["reviews"]
        .as_array_mut()
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Review not found"))?;
    let before = reviews.len();
    reviews.retain(|r| !(r["_id"] == review_id.as_str() && r["user"] == user_id));
    if reviews.len() == before {
        return Err(error(StatusCode::NOT_FOUND, "Review not found"));
    }
    recompute_rating(product);
    Ok(Json(json!({ "message": "Review removed" })))
}

fn recompute_rating(product: &mut Value) {
    let ratings: Vec<f64> = product["reviews"]
        .as_array()
        .map(|r| r.iter().filter_map(|r| r["rating"].as_f64()).collect())
        .unwrap_or_default();
    if !ratings.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        let count = ratings.len() as f64;
        product["rating"] = json!(ratings.iter().sum::<f64>() / count);
    }
}

// =============================================================================
// Cart Handlers
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineBody {
    product_id: String,
    quantity: u32,
    size: String,
    color: String,
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> HandlerResult {
    let s = state.lock().await;
    s.authorize(&headers)?;
    Ok(Json(s.cart_json()))
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> HandlerResult {
    let mut s = state.lock().await;
    s.authorize(&headers)?;
    let stock = s
        .stock(&body.product_id, &body.size, &body.color)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Variant not found"))?;

    let index = s.line_index(&body.product_id, &body.size, &body.color);
    let current = index.map_or(0, |i| s.cart[i].quantity);
    let wanted = current + body.quantity;
    if u64::from(wanted) > stock {
        return Err(error(
            StatusCode::BAD_REQUEST,
            &format!("Only {stock} left in stock"),
        ));
    }
    match index {
        Some(i) => s.cart[i].quantity = wanted,
        None => s.cart.push(CartLine {
            product_id: body.product_id,
            size: body.size,
            color: body.color,
            quantity: body.quantity,
        }),
    }
    Ok(Json(s.cart_json()))
}

async fn update_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> HandlerResult {
    let mut s = state.lock().await;
    s.authorize(&headers)?;
    let stock = s
        .stock(&body.product_id, &body.size, &body.color)
        .unwrap_or(0);
    if u64::from(body.quantity) > stock {
        return Err(error(
            StatusCode::BAD_REQUEST,
            &format!("Only {stock} left in stock"),
        ));
    }
    let index = s
        .line_index(&body.product_id, &body.size, &body.color)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Item not in cart"))?;
    s.cart[index].quantity = body.quantity;
    Ok(Json(s.cart_json()))
}

async fn remove_from_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((product, size, color)): Path<(String, String, String)>,
) -> HandlerResult {
    let mut s = state.lock().await;
    s.authorize(&headers)?;
    s.cart
        .retain(|l| !(l.product_id == product && l.size == size && l.color == color));
    Ok(Json(s.cart_json()))
}

// =============================================================================
// Wishlist Handlers
// =============================================================================

async fn get_wishlist(State(state): State<Shared>, headers: HeaderMap) -> HandlerResult {
    let s = state.lock().await;
    s.authorize(&headers)?;
    Ok(Json(s.wishlist_json()))
}

async fn add_to_wishlist(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> HandlerResult {
    let mut s = state.lock().await;
    s.authorize(&headers)?;
    let id = body["productId"]
        .as_str()
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "productId required"))?
        .to_string();
    if s.product(&id).is_none() {
        return Err(error(StatusCode::NOT_FOUND, "Product not found"));
    }
    if !s.wishlist.contains(&id) {
        s.wishlist.push(id);
    }
    Ok(Json(s.wishlist_json()))
}

async fn remove_from_wishlist(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(product): Path<String>,
) -> HandlerResult {
    let mut s = state.lock().await;
    s.authorize(&headers)?;
    s.wishlist.retain(|id| *id != product);
    Ok(Json(s.wishlist_json()))
}

// =============================================================================
// Order Handlers
// =============================================================================

async fn list_orders(State(state): State<Shared>, headers: HeaderMap) -> HandlerResult {
    let s = state.lock().await;
    let email = s.authorize(&headers)?;
    let user_id = s.user(&email)["_id"].clone();
    let orders: Vec<Value> = s
        .orders
        .iter()
        .filter(|o| o["user"]["_id"] == user_id)
        .cloned()
        .collect();
    Ok(Json(Value::Array(orders)))
}

async fn place_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> HandlerResult {
    let mut s = state.lock().await;
    let email = s.authorize(&headers)?;
    if s.cart.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Cart is empty"));
    }
    let address = &body["shippingAddress"];
    for field in ["address", "city", "postalCode", "country"] {
        if address[field].as_str().is_none_or(|v| v.trim().is_empty()) {
            return Err(error(StatusCode::BAD_REQUEST, "Shipping address incomplete"));
        }
    }

    let cart = s.cart_json();
    let items: Vec<Value> = cart["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    json!({
                        "product": item["product"]["_id"],
                        "name": item["product"]["name"],
                        "price": item["product"]["price"],
                        "quantity": item["quantity"],
                        "size": item["size"],
                        "color": item["color"],
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    let subtotal = cart["total"].as_f64().unwrap_or(0.0);
    let delay_ms = i64::try_from(s.delivery_delay.as_millis()).unwrap_or(i64::MAX);
    let user = s.user(&email);
    let id = s.next_id("O");

    let order = json!({
        "_id": id,
        "orderItems": items,
        "shippingAddress": address,
        "totalPrice": subtotal + SHIPPING_FEE,
        "isPaid": false,
        "isDelivered": false,
        "status": "Pending",
        "deliveryTime": now_ms().saturating_add(delay_ms),
        "createdAt": chrono::Utc::now().to_rfc3339(),
        "user": { "_id": user["_id"], "username": user["username"], "email": user["email"] },
    });
    s.orders.push(order.clone());
    let lines = std::mem::take(&mut s.cart);
    for line in &lines {
        s.take_stock(line);
    }
    Ok(Json(order))
}

async fn confirm_delivery(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> HandlerResult {
    let mut s = state.lock().await;
    s.authorize(&headers)?;
    if s.fail_confirmations {
        return Err(error(StatusCode::SERVICE_UNAVAILABLE, "Try again later"));
    }
    if body["status"] != "Delivered" {
        return Err(error(StatusCode::BAD_REQUEST, "Unsupported status"));
    }
    set_order_status(&mut s, &id, "Delivered")
}

async fn admin_orders(State(state): State<Shared>, headers: HeaderMap) -> HandlerResult {
    let s = state.lock().await;
    s.authorize_admin(&headers)?;
    Ok(Json(Value::Array(s.orders.clone())))
}

async fn admin_deliver(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> HandlerResult {
    let mut s = state.lock().await;
    s.authorize_admin(&headers)?;
    set_order_status(&mut s, &id, "Delivered")
}

async fn admin_cancel(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> HandlerResult {
    let mut s = state.lock().await;
    s.authorize_admin(&headers)?;
    set_order_status(&mut s, &id, "Cancelled")
}

fn set_order_status(s: &mut BackendState, id: &str, status: &str) -> HandlerResult {
    let order = s
        .orders
        .iter_mut()
        .find(|o| o["_id"] == id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Order not found"))?;
    if order["status"] != "Pending" {
        return Err(error(StatusCode::BAD_REQUEST, "Order already finalized"));
    }
    order["status"] = json!(status);
    order["isDelivered"] = json!(status == "Delivered");
    Ok(Json(order.clone()))
}
