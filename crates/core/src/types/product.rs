//! Catalog types: products, variants and reviews.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{ProductId, ReviewId, UserId};
use super::price::Price;

/// A purchasable (size, color) combination with its own stock count.
///
/// Unique by `(size, color)` within a product. Stock is unsigned so it can
/// never go negative on the client side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub size: String,
    pub color: String,
    #[serde(default)]
    pub stock: u32,
}

impl Variant {
    /// Create a variant.
    #[must_use]
    pub fn new(size: impl Into<String>, color: impl Into<String>, stock: u32) -> Self {
        Self {
            size: size.into(),
            color: color.into(),
            stock,
        }
    }

    /// Whether at least one unit is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Author of a review: either a bare user ID or a populated summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewAuthor {
    Populated {
        #[serde(rename = "_id")]
        id: UserId,
        #[serde(default)]
        username: Option<String>,
    },
    Id(UserId),
}

impl ReviewAuthor {
    /// The author's user ID regardless of population.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        match self {
            Self::Populated { id, .. } | Self::Id(id) => id,
        }
    }
}

/// A product review. One per user per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub user: ReviewAuthor,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub price: Price,
    #[serde(default)]
    pub original_price: Option<Price>,
    /// Discount percentage, 0-100. The admin form allows fractions.
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub description: String,
    /// Server-relative image paths.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub rating: f64,
    /// Some listings send only a review count here; that reads as empty.
    #[serde(default, deserialize_with = "deserialize_reviews")]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_new_arrival: bool,
}

fn deserialize_reviews<'de, D>(deserializer: D) -> Result<Vec<Review>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Reviews {
        List(Vec<Review>),
        Count(u64),
    }

    Ok(match Option::<Reviews>::deserialize(deserializer)? {
        Some(Reviews::List(reviews)) => reviews,
        Some(Reviews::Count(_)) | None => Vec::new(),
    })
}

impl Product {
    /// The review left by `user`, if any.
    #[must_use]
    pub fn review_by(&self, user: &UserId) -> Option<&Review> {
        self.reviews.iter().find(|review| review.user.id() == user)
    }

    /// Total units in stock across all variants.
    #[must_use]
    pub fn total_stock(&self) -> u32 {
        self.variants
            .iter()
            .fold(0u32, |acc, variant| acc.saturating_add(variant.stock))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PRODUCT_JSON: &str = r#"{
        "_id": "P1",
        "name": "Runner",
        "brand": "Sole",
        "category": "Men",
        "type": "Sneakers",
        "price": 500,
        "originalPrice": 800,
        "discount": 37,
        "images": ["/uploads/runner.jpg"],
        "variants": [
            {"size": "M", "color": "Red", "stock": 0},
            {"size": "M", "color": "Blue", "stock": 3}
        ],
        "rating": 4.5,
        "reviews": [
            {"_id": "R1", "user": {"_id": "U1", "username": "asha"}, "rating": 5, "comment": "great"},
            {"_id": "R2", "user": "U2", "rating": 3, "comment": "ok"}
        ]
    }"#;

    #[test]
    fn test_deserialize_product() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        assert_eq!(product.id.as_str(), "P1");
        assert_eq!(product.kind, "Sneakers");
        assert_eq!(product.price, Price::from_rupees(500));
        assert_eq!(product.original_price, Some(Price::from_rupees(800)));
        assert_eq!(product.variants.len(), 2);
        assert_eq!(product.total_stock(), 3);
    }

    #[test]
    fn test_review_by_matches_both_author_shapes() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        assert_eq!(
            product.review_by(&UserId::new("U1")).map(|r| r.rating),
            Some(5)
        );
        assert_eq!(
            product.review_by(&UserId::new("U2")).map(|r| r.rating),
            Some(3)
        );
        assert!(product.review_by(&UserId::new("U3")).is_none());
    }

    #[test]
    fn test_review_count_reads_as_empty_list() {
        let product: Product = serde_json::from_str(
            r#"{"_id": "P3", "name": "Loafer", "price": 900, "reviews": 12}"#,
        )
        .unwrap();
        assert!(product.reviews.is_empty());
    }

    #[test]
    fn test_fractional_discount() {
        let product: Product = serde_json::from_str(
            r#"{"_id": "P9", "name": "x", "price": 100, "discount": 12.5}"#,
        )
        .unwrap();
        assert_eq!(product.discount, Decimal::new(125, 1));
        assert_eq!(
            product.price.discounted(product.discount),
            Price::new(Decimal::new(875, 1))
        );
    }

    #[test]
    fn test_minimal_product_uses_defaults() {
        let product: Product =
            serde_json::from_str(r#"{"_id": "P2", "name": "Sandal", "price": 250}"#).unwrap();
        assert!(product.variants.is_empty());
        assert_eq!(product.discount, Decimal::ZERO);
        assert!(product.original_price.is_none());
    }
}
