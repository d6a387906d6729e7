//! Unified error handling.
//!
//! [`ApiError`] covers everything that can go wrong talking to the backend.
//! [`ClientError`] is what store and storefront operations return; every
//! variant maps to a user-facing [`Notification`](crate::notify::Notification).

use reqwest::StatusCode;
use thiserror::Error;

use sole_society_core::StatusTransitionError;

use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::validation::ValidationErrors;

/// Message shown when the server gave no usable error body.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Errors from the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    ///
    /// `message` is the server-supplied `message` field, or
    /// [`GENERIC_FAILURE`] when the body had none.
    #[error("{message} (HTTP {status})")]
    Status { status: StatusCode, message: String },

    /// The body of a successful response did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The client has no credential for an endpoint that requires one.
    #[error("not signed in")]
    MissingCredential,
}

impl ApiError {
    /// Whether this is an authorization failure.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
            || matches!(self, Self::MissingCredential)
    }

    /// HTTP status, when the backend responded.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors returned by stores and storefront operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Input failed client-side validation; nothing was sent.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// Persisted session could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The operation needs a signed-in user.
    #[error("Please login first")]
    NotAuthenticated,

    /// The operation needs an admin account.
    #[error("Admin access required")]
    Forbidden,

    /// Add-to-cart without a resolvable size/color pair.
    #[error("Please select size and color")]
    NoVariantSelected,

    /// Add-to-cart on a variant with zero stock.
    #[error("Out of stock")]
    OutOfStock,

    /// Checkout with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// A local status update would move an order backwards.
    #[error(transparent)]
    StatusTransition(#[from] StatusTransitionError),

    /// A referenced entity does not exist locally.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ClientError {
    /// Whether the failure was caught before contacting the server.
    #[must_use]
    pub const fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotAuthenticated
                | Self::Forbidden
                | Self::NoVariantSelected
                | Self::OutOfStock
                | Self::EmptyCart
        )
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;
