//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId};
use super::price::Price;
use super::status::{OrderStatus, StatusTransitionError};

/// Delivery destination captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// A copy with every field trimmed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            address: self.address.trim().to_owned(),
            city: self.city.trim().to_owned(),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
        }
    }
}

/// Snapshot of a purchased line. Prices and images are frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub product: Option<ProductId>,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Customer summary populated on admin order listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    pub total_price: Price,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub is_delivered: bool,
    #[serde(default)]
    pub status: OrderStatus,
    /// Client-visible delivery deadline (epoch milliseconds on the wire).
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub delivery_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Only present on admin listings, where the backend populates it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<OrderCustomer>,
}

impl Order {
    /// Apply a forward-only status change, keeping `is_delivered` in sync.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` when the change would move backwards.
    pub fn set_status(&mut self, next: OrderStatus) -> Result<(), StatusTransitionError> {
        self.status = self.status.transition(next)?;
        if next == OrderStatus::Delivered {
            self.is_delivered = true;
        }
        Ok(())
    }

    /// Total number of units across all items.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.order_items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }
}
