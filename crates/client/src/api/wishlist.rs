//! Wishlist endpoints. Every call returns the full, authoritative list.

use reqwest::Method;
use serde_json::json;
use tracing::instrument;

use sole_society_core::{Product, ProductId};

use super::{ApiClient, Body, encode_segment};
use crate::error::ApiError;

impl ApiClient {
    /// Fetch the signed-in user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn wishlist(&self) -> Result<Vec<Product>, ApiError> {
        let list: Option<Vec<Product>> = self.get("/wishlist").await?;
        Ok(list.unwrap_or_default())
    }

    /// Add a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(&self, product_id: &ProductId) -> Result<Vec<Product>, ApiError> {
        let body = Body::Json(json!({ "productId": product_id }));
        let list: Option<Vec<Product>> = self.request(Method::POST, "/wishlist", body).await?;
        Ok(list.unwrap_or_default())
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_wishlist(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<Product>, ApiError> {
        let path = format!("/wishlist/{}", encode_segment(product_id.as_str()));
        let list: Option<Vec<Product>> = self.request(Method::DELETE, &path, Body::Empty).await?;
        Ok(list.unwrap_or_default())
    }
}
