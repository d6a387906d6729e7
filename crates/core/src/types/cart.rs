//! Cart types.
//!
//! The server owns the cart. The client keeps a mirror that is replaced
//! wholesale after every mutation, so these types only describe what the
//! backend returns.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Shown for lines whose product no longer exists.
const UNAVAILABLE: &str = "Unavailable product";

/// The slice of a product the cart endpoints embed in each line.
///
/// Once a product is deleted the backend still embeds its ID but sends
/// `null` for the remaining fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A cart line's product: embedded by most endpoints, a bare ID by some,
/// `null` when the backend could not resolve it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Embedded(Box<CartProduct>),
    Id(ProductId),
    #[default]
    Missing,
}

impl ProductRef {
    /// The referenced product ID, unless the product is missing entirely.
    #[must_use]
    pub fn id(&self) -> Option<&ProductId> {
        match self {
            Self::Embedded(product) => Some(&product.id),
            Self::Id(id) => Some(id),
            Self::Missing => None,
        }
    }

    /// Unit price, when the product is embedded and priced.
    #[must_use]
    pub fn price(&self) -> Option<Price> {
        match self {
            Self::Embedded(product) => product.price,
            Self::Id(_) | Self::Missing => None,
        }
    }

    /// Display name, falling back to the ID for bare references.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Embedded(product) if !product.name.is_empty() => &product.name,
            Self::Embedded(product) => product.id.as_str(),
            Self::Id(id) => id.as_str(),
            Self::Missing => UNAVAILABLE,
        }
    }

    /// First image path, if embedded.
    #[must_use]
    pub fn first_image(&self) -> Option<&str> {
        match self {
            Self::Embedded(product) => product.images.first().map(String::as_str),
            Self::Id(_) | Self::Missing => None,
        }
    }

    /// Whether the backend still knows the product: it has a price or at
    /// least a name.
    #[must_use]
    pub fn is_available(&self) -> bool {
        match self {
            Self::Embedded(product) => product.price.is_some() || !product.name.is_empty(),
            Self::Id(_) => true,
            Self::Missing => false,
        }
    }
}

/// Identity of a cart line: `(product, size, color)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
}

impl LineKey {
    /// Create a line key.
    #[must_use]
    pub fn new(product_id: ProductId, size: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            product_id,
            size: size.into(),
            color: color.into(),
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.product_id, self.size, self.color)
    }
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(default)]
    pub product: ProductRef,
    pub quantity: u32,
    pub size: String,
    pub color: String,
}

impl CartItem {
    /// The line's identity. Lines with no product at all key on an empty ID.
    #[must_use]
    pub fn key(&self) -> LineKey {
        let product_id = self
            .product
            .id()
            .cloned()
            .unwrap_or_else(|| ProductId::new(""));
        LineKey::new(product_id, &self.size, &self.color)
    }

    /// Unit price times quantity; lines without a known price count as zero.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price().unwrap_or(Price::ZERO) * self.quantity
    }
}

/// A cart as returned by every `/cart` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Server-computed total, when the endpoint includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Price>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of units across all lines (the navbar badge).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Find the line for a key.
    #[must_use]
    pub fn line(&self, key: &LineKey) -> Option<&CartItem> {
        self.items.iter().find(|item| item.key() == *key)
    }

    /// Whether a line exists for `(product, size, color)`.
    #[must_use]
    pub fn contains(&self, key: &LineKey) -> bool {
        self.line(key).is_some()
    }

    /// Sum of line totals computed from embedded prices.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_embedded_and_bare_lines() {
        let json = r#"{
            "items": [
                {"product": {"_id": "P1", "name": "Runner", "price": 500, "images": ["/a.jpg"]},
                 "quantity": 2, "size": "M", "color": "Red"},
                {"product": "P2", "quantity": 1, "size": "L", "color": "Black"}
            ],
            "total": 1000
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.items[0].product.name(), "Runner");
        assert_eq!(cart.items[1].product.id().unwrap().as_str(), "P2");
        assert_eq!(cart.total, Some(Price::from_rupees(1000)));
    }

    #[test]
    fn test_subtotal_ignores_unpriced_lines() {
        let json = r#"{"items": [
            {"product": {"_id": "P1", "price": 500}, "quantity": 2, "size": "M", "color": "Red"},
            {"product": "P2", "quantity": 4, "size": "M", "color": "Red"}
        ]}"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.subtotal(), Price::from_rupees(1000));
    }

    #[test]
    fn test_line_lookup_by_key() {
        let json = r#"{"items": [
            {"product": {"_id": "P1", "price": 500}, "quantity": 2, "size": "M", "color": "Red"}
        ]}"#;
        let cart: Cart = serde_json::from_str(json).unwrap();

        assert!(cart.contains(&LineKey::new(ProductId::new("P1"), "M", "Red")));
        assert!(!cart.contains(&LineKey::new(ProductId::new("P1"), "M", "Blue")));
    }

    #[test]
    fn test_deleted_products_decode_as_unpriced_lines() {
        let json = r#"{"items": [
            {"product": {"_id": "P1", "name": "Runner", "price": 500, "images": ["/a.jpg"]},
             "quantity": 1, "size": "M", "color": "Red"},
            {"product": {"_id": "P9", "name": null, "price": null, "images": null},
             "quantity": 2, "size": "M", "color": "Red"},
            {"product": null, "quantity": 3, "size": "L", "color": "Black"}
        ]}"#;
        let cart: Cart = serde_json::from_str(json).unwrap();

        assert_eq!(cart.items.len(), 3);
        assert_eq!(cart.item_count(), 6);
        assert_eq!(cart.subtotal(), Price::from_rupees(500));

        let deleted = &cart.items[1];
        assert_eq!(deleted.product.name(), "P9");
        assert_eq!(deleted.product.first_image(), None);
        assert!(!deleted.product.is_available());
        assert_eq!(deleted.line_total(), Price::ZERO);
        assert!(cart.contains(&LineKey::new(ProductId::new("P9"), "M", "Red")));

        let missing = &cart.items[2];
        assert_eq!(missing.product, ProductRef::Missing);
        assert_eq!(missing.product.id(), None);
        assert_eq!(missing.product.name(), "Unavailable product");
        assert_eq!(missing.line_total(), Price::ZERO);
    }

    #[test]
    fn test_empty_object_is_empty_cart() {
        let cart: Cart = serde_json::from_str("{}").unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart, Cart::empty());
    }
}
