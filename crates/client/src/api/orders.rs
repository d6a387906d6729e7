//! Customer order endpoints.

use reqwest::Method;
use serde_json::json;
use tracing::instrument;

use sole_society_core::{Order, OrderId, OrderStatus, ShippingAddress};

use super::{ApiClient, Body, encode_segment, entity};
use crate::error::ApiError;

impl ApiClient {
    /// Fetch the signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        let orders: Option<Vec<Order>> = self.get("/orders").await?;
        Ok(orders.unwrap_or_default())
    }

    /// Place an order for the current server-side cart.
    ///
    /// Returns the created order when the backend echoes it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` when the cart is empty or stock ran out.
    #[instrument(skip(self, address), fields(city = %address.city))]
    pub async fn place_order(&self, address: &ShippingAddress) -> Result<Option<Order>, ApiError> {
        let body = Body::Json(json!({ "shippingAddress": address }));
        let response: Option<serde_json::Value> =
            self.request(Method::POST, "/orders", body).await?;
        Ok(entity(response))
    }

    /// Ask the backend to confirm an order whose delivery deadline passed.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend does not acknowledge the change.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn confirm_delivery(&self, id: &OrderId) -> Result<Option<Order>, ApiError> {
        let path = format!("/orders/{}", encode_segment(id.as_str()));
        let body = Body::Json(json!({ "status": OrderStatus::Delivered }));
        let response: Option<serde_json::Value> =
            self.request(Method::PATCH, &path, body).await?;
        Ok(entity(response))
    }
}
