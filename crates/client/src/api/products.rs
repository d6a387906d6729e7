//! Catalog and review endpoints.
//!
//! Catalog reads are cached for the configured TTL (five minutes by default).
//! Review, admin and order writes drop the whole cache, since listings carry
//! each product's rating and stock as well.

use reqwest::Method;
use serde::Serialize;
use tracing::{debug, instrument};

use sole_society_core::{Product, ProductId, ReviewId};

use super::cache::{CacheKey, CacheValue};
use super::{Acknowledgement, ApiClient, Body, encode_segment};
use crate::error::ApiError;

/// Filters for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Backend category filter such as `men` or `women`.
    pub category: Option<String>,
}

impl ProductQuery {
    /// Query for one category.
    #[must_use]
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
        }
    }

    fn path(&self) -> String {
        self.category.as_deref().map_or_else(
            || "/products".to_string(),
            |category| format!("/products?category={}", encode_segment(category)),
        )
    }
}

/// Body of a review create or edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewInput {
    pub rating: u8,
    pub comment: String,
}

impl ApiClient {
    // =========================================================================
    // Catalog
    // =========================================================================

    /// List products, optionally filtered by category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let cache_key = CacheKey::Products {
            category: query.category.clone(),
        };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let products: Option<Vec<Product>> = self.get(&query.path()).await?;
        let products = products.unwrap_or_default();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Fetch one product with its variants and reviews.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 404 if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .get(&format!("/products/{}", encode_segment(id.as_str())))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Fetch one product, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn product_fresh(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.invalidate_product(id).await;
        self.product(id).await
    }

    /// Drop a cached product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.inner
            .cache
            .invalidate(&CacheKey::Product(id.clone()))
            .await;
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Post a new review.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the review (for example a
    /// second review by the same user).
    #[instrument(skip(self, review), fields(product_id = %product_id))]
    pub async fn create_review(
        &self,
        product_id: &ProductId,
        review: &ReviewInput,
    ) -> Result<Acknowledgement, ApiError> {
        let path = format!("/products/{}/reviews", encode_segment(product_id.as_str()));
        let ack: Option<Acknowledgement> = self
            .request(Method::POST, &path, Body::json(review)?)
            .await?;
        self.invalidate_catalog();
        Ok(ack.unwrap_or_default())
    }

    /// Edit an existing review.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the review does not belong to the user.
    #[instrument(skip(self, review), fields(product_id = %product_id, review_id = %review_id))]
    pub async fn update_review(
        &self,
        product_id: &ProductId,
        review_id: &ReviewId,
        review: &ReviewInput,
    ) -> Result<Acknowledgement, ApiError> {
        let path = review_path(product_id, review_id);
        let ack: Option<Acknowledgement> = self
            .request(Method::PUT, &path, Body::json(review)?)
            .await?;
        self.invalidate_catalog();
        Ok(ack.unwrap_or_default())
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend call fails.
    #[instrument(skip(self), fields(product_id = %product_id, review_id = %review_id))]
    pub async fn delete_review(
        &self,
        product_id: &ProductId,
        review_id: &ReviewId,
    ) -> Result<Acknowledgement, ApiError> {
        let path = review_path(product_id, review_id);
        let ack: Option<Acknowledgement> =
            self.request(Method::DELETE, &path, Body::Empty).await?;
        self.invalidate_catalog();
        Ok(ack.unwrap_or_default())
    }
}

fn review_path(product_id: &ProductId, review_id: &ReviewId) -> String {
    format!(
        "/products/{}/reviews/{}",
        encode_segment(product_id.as_str()),
        encode_segment(review_id.as_str())
    )
}
