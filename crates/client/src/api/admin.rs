//! Admin endpoints: product management and order fulfillment.
//!
//! Product writes are multipart: scalar fields as text, `variants` as a JSON
//! string and each image as an `images` file part. Any product write drops
//! the catalog cache.

use reqwest::Method;
use rust_decimal::Decimal;
use tracing::instrument;

use sole_society_core::{Order, OrderId, Product, ProductId};

use super::{ApiClient, Body, MultipartPayload, encode_segment, entity};
use crate::error::ApiError;
use crate::validation::ProductForm;

impl ApiClient {
    // =========================================================================
    // Products
    // =========================================================================

    /// Create a product. Returns it when the backend echoes it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the product.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create_product(&self, form: &ProductForm) -> Result<Option<Product>, ApiError> {
        let body = Body::Multipart(product_payload(form)?);
        let response: Option<serde_json::Value> =
            self.request(Method::POST, "/products", body).await?;
        self.invalidate_catalog();
        Ok(entity(response))
    }

    /// Update a product. Images in the form are added to the existing ones.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the update.
    #[instrument(skip(self, form), fields(product_id = %id, name = %form.name))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        form: &ProductForm,
    ) -> Result<Option<Product>, ApiError> {
        let path = format!("/products/{}", encode_segment(id.as_str()));
        let body = Body::Multipart(product_payload(form)?);
        let response: Option<serde_json::Value> = self.request(Method::PUT, &path, body).await?;
        self.invalidate_catalog();
        Ok(entity(response))
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        let path = format!("/products/{}", encode_segment(id.as_str()));
        let _: Option<serde_json::Value> = self.request(Method::DELETE, &path, Body::Empty).await?;
        self.invalidate_catalog();
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Every order in the store, with customer summaries.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the user is not an admin.
    #[instrument(skip(self))]
    pub async fn admin_orders(&self) -> Result<Vec<Order>, ApiError> {
        let orders: Option<Vec<Order>> = self.get("/orders/admin").await?;
        Ok(orders.unwrap_or_default())
    }

    /// Mark an order delivered.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn mark_order_delivered(&self, id: &OrderId) -> Result<Option<Order>, ApiError> {
        self.order_action(id, "deliver").await
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &OrderId) -> Result<Option<Order>, ApiError> {
        self.order_action(id, "cancel").await
    }

    async fn order_action(&self, id: &OrderId, action: &str) -> Result<Option<Order>, ApiError> {
        let path = format!("/orders/{}/{action}", encode_segment(id.as_str()));
        let response: Option<serde_json::Value> =
            self.request(Method::PUT, &path, Body::Empty).await?;
        Ok(entity(response))
    }
}

/// Multipart payload for a product form.
pub(crate) fn product_payload(form: &ProductForm) -> Result<MultipartPayload, ApiError> {
    let variants = serde_json::to_string(&form.wire_variants())?;

    let mut payload = MultipartPayload::new()
        .text("name", form.name.trim())
        .text("brand", form.brand.trim())
        .text("category", form.category.trim())
        .text("type", form.kind.trim())
        .text("description", form.description.trim())
        .text("price", form.price.normalize().to_string())
        .text(
            "discount",
            form.discount
                .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
                .normalize()
                .to_string(),
        )
        .text("variants", variants)
        .text("isFeatured", form.is_featured.to_string())
        .text("isNewArrival", form.is_new_arrival.to_string());

    if let Some(original) = form.original_price {
        payload = payload.text("originalPrice", original.normalize().to_string());
    }

    for image in &form.images {
        payload = payload.file("images", image.clone());
    }

    Ok(payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::ImageUpload;
    use crate::validation::VariantInput;

    #[test]
    fn test_product_payload_fields() {
        let form = ProductForm {
            name: " Runner ".into(),
            kind: "Sneakers".into(),
            price: Decimal::new(99950, 2),
            original_price: Some(Decimal::from(1200)),
            discount: Decimal::new(125, 1),
            variants: vec![VariantInput {
                size: "M".into(),
                color: "Red".into(),
                stock: 4,
            }],
            images: vec![
                ImageUpload::new("a.jpg", "image/jpeg", vec![1]),
                ImageUpload::new("b.jpg", "image/jpeg", vec![2]),
            ],
            ..ProductForm::default()
        };

        let payload = product_payload(&form).unwrap();
        assert_eq!(payload.field("name"), Some("Runner"));
        assert_eq!(payload.field("type"), Some("Sneakers"));
        assert_eq!(payload.field("price"), Some("999.5"));
        assert_eq!(payload.field("originalPrice"), Some("1200"));
        assert_eq!(payload.field("discount"), Some("12.5"));
        assert_eq!(payload.field("isFeatured"), Some("false"));
        assert_eq!(payload.file_count(), 2);

        let variants: serde_json::Value =
            serde_json::from_str(payload.field("variants").unwrap()).unwrap();
        assert_eq!(
            variants,
            serde_json::json!([{"size": "M", "color": "Red", "stock": 4}])
        );
    }

    #[test]
    fn test_product_payload_omits_missing_original_price() {
        let payload = product_payload(&ProductForm::default()).unwrap();
        assert!(payload.field("originalPrice").is_none());
    }
}
