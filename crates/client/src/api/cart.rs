//! Cart endpoints. Every mutation returns the authoritative cart.

use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use sole_society_core::{Cart, LineKey, ProductId};

use super::{ApiClient, Body, encode_segment};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartLineRequest<'a> {
    product_id: &'a ProductId,
    quantity: u32,
    size: &'a str,
    color: &'a str,
}

impl<'a> CartLineRequest<'a> {
    const fn new(key: &'a LineKey, quantity: u32) -> Self {
        Self {
            product_id: &key.product_id,
            quantity,
            size: key.size.as_str(),
            color: key.color.as_str(),
        }
    }
}

impl ApiClient {
    /// Fetch the signed-in user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<Cart, ApiError> {
        let cart: Option<Cart> = self.get("/cart").await?;
        Ok(cart.unwrap_or_default())
    }

    /// Add units of a line. The backend merges with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` when stock is insufficient.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn add_to_cart(&self, key: &LineKey, quantity: u32) -> Result<Cart, ApiError> {
        let body = Body::json(&CartLineRequest::new(key, quantity))?;
        let cart: Option<Cart> = self.request(Method::POST, "/cart", body).await?;
        Ok(cart.unwrap_or_default())
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` when stock is insufficient.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn update_cart_item(&self, key: &LineKey, quantity: u32) -> Result<Cart, ApiError> {
        let body = Body::json(&CartLineRequest::new(key, quantity))?;
        let cart: Option<Cart> = self.request(Method::PUT, "/cart", body).await?;
        Ok(cart.unwrap_or_default())
    }

    /// Remove a line entirely.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn remove_from_cart(&self, key: &LineKey) -> Result<Cart, ApiError> {
        let cart: Option<Cart> = self
            .request(Method::DELETE, &line_path(key), Body::Empty)
            .await?;
        Ok(cart.unwrap_or_default())
    }
}

fn line_path(key: &LineKey) -> String {
    format!(
        "/cart/{}/{}/{}",
        encode_segment(key.product_id.as_str()),
        encode_segment(&key.size),
        encode_segment(&key.color)
    )
}
