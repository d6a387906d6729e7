//! Storefront REST API client.
//!
//! Every call goes through [`ApiClient::request`], which attaches the bearer
//! token, encodes the body and turns non-success responses into
//! [`ApiError::Status`] carrying the server's `message`. A 401 on any path
//! other than login, registration or verification triggers one
//! `POST /auth/refresh`; if that succeeds the original request is sent again,
//! exactly once.
//!
//! Endpoint groups live in submodules as further `impl ApiClient` blocks.
//! Catalog reads are cached with `moka`.

mod admin;
mod auth;
mod body;
mod cache;
mod cart;
mod orders;
mod products;
mod wishlist;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, GENERIC_FAILURE};

pub use auth::Acknowledgement;
pub use body::{Body, ImageUpload, MultipartPayload};
pub use products::{ProductQuery, ReviewInput};

use cache::{CacheKey, CacheValue};

/// Path segments whose 401s are final: a refresh cannot fix bad credentials.
const NO_REFRESH_SEGMENTS: [&str; 3] = ["/login", "/register", "/verify"];

const REFRESH_PATH: &str = "/auth/refresh";

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront backend.
///
/// Cheap to clone; clones share the HTTP connection pool, the token and the
/// catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    config: ClientConfig,
    /// Bearer token attached to every request when present.
    token: RwLock<Option<SecretString>>,
    /// Bumped whenever the token changes; lets concurrent 401s share one refresh.
    token_generation: AtomicU64,
    /// Serializes refresh attempts.
    refresh_lock: Mutex<()>,
    /// Notified with the new generation after a successful refresh.
    refreshed: watch::Sender<u64>,
    cache: Cache<CacheKey, CacheValue>,
}

/// Error body shape used by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Body returned by `POST /auth/refresh` and `POST /auth/login`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Option<SecretString> {
        self.token
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
    }
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let (refreshed, _) = watch::channel(0);

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                config: config.clone(),
                token: RwLock::new(None),
                token_generation: AtomicU64::new(0),
                refresh_lock: Mutex::new(()),
                refreshed,
                cache,
            }),
        })
    }

    /// Configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // =========================================================================
    // Credential
    // =========================================================================

    /// Replace the bearer token.
    pub async fn set_token(&self, token: Option<SecretString>) {
        *self.inner.token.write().await = token;
        self.inner.token_generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Current bearer token, if any.
    pub async fn token(&self) -> Option<SecretString> {
        self.inner.token.read().await.clone()
    }

    /// Whether a bearer token is held.
    pub async fn has_token(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    /// Drop the bearer token.
    pub async fn clear_token(&self) {
        self.set_token(None).await;
    }

    /// Watch for tokens replaced by a session refresh.
    #[must_use]
    pub fn subscribe_refreshes(&self) -> watch::Receiver<u64> {
        self.inner.refreshed.subscribe()
    }

    // =========================================================================
    // Request Execution
    // =========================================================================

    /// Perform a request and decode the JSON response.
    ///
    /// An empty success body decodes as JSON `null`, so callers that expect
    /// nothing can ask for `()` or `Option<T>`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` for non-success responses (after at most one
    /// refresh-and-retry on 401), `ApiError::Http` when the backend cannot be
    /// reached, and `ApiError::Parse` when the body has an unexpected shape.
    #[instrument(skip(self, body))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Body,
    ) -> Result<T, ApiError> {
        let generation = self.inner.token_generation.load(Ordering::Acquire);

        match self.send(method.clone(), path, &body).await {
            Err(err) if err.is_unauthorized() && allows_refresh(path) => {
                debug!("Unauthorized, attempting session refresh");
                if let Err(refresh_err) = self.refresh_session(generation).await {
                    debug!(error = %refresh_err, "Session refresh failed");
                    return Err(err);
                }
                self.send(method, path, &body).await
            }
            result => result,
        }
    }

    /// `GET` without a body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, Body::Empty).await
    }

    /// Refresh the session unless another task already did since `seen`.
    async fn refresh_session(&self, seen: u64) -> Result<(), ApiError> {
        let _guard = self.inner.refresh_lock.lock().await;

        if self.inner.token_generation.load(Ordering::Acquire) != seen {
            debug!("Token changed while waiting, skipping refresh");
            return Ok(());
        }

        let response: Option<TokenResponse> =
            self.send(Method::POST, REFRESH_PATH, &Body::Empty).await?;

        if let Some(token) = response.and_then(TokenResponse::into_token) {
            self.set_token(Some(token)).await;
            let generation = self.inner.token_generation.load(Ordering::Acquire);
            self.inner.refreshed.send_replace(generation);
            debug!("Session token refreshed");
        }

        Ok(())
    }

    /// One HTTP round trip.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &Body,
    ) -> Result<T, ApiError> {
        let url = self.inner.config.endpoint(path);
        let mut builder = self.inner.client.request(method, url);

        if let Some(token) = self.inner.token.read().await.as_ref() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        builder = match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(payload) => builder.multipart(payload.to_form()?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text);
            debug!(status = %status, message = %message, "Backend returned non-success status");
            return Err(ApiError::Status { status, message });
        }

        decode(&text)
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.inner.config.api_url.as_str())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn allows_refresh(path: &str) -> bool {
    !NO_REFRESH_SEGMENTS
        .iter()
        .any(|segment| path.contains(segment))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| {
        warn!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        ApiError::Parse(e)
    })
}

/// Read an entity out of a mutation response that may be only an
/// acknowledgement.
pub(crate) fn entity<T: DeserializeOwned>(value: Option<serde_json::Value>) -> Option<T> {
    value.and_then(|v| serde_json::from_value(v).ok())
}

/// Percent-encode one path segment.
pub(crate) fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
