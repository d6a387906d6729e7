//! Product detail variant selection.
//!
//! Sizes come from the variants in first-seen order. Picking a size narrows
//! the colors to variants of that size and resets the color to the first of
//! them. The resolved (size, color) variant gates add-to-cart on its stock.

use std::fmt;

use sole_society_core::{Cart, LineKey, Product, ProductId, Variant};

use crate::error::ClientError;

/// Stock at or below this shows a low-stock warning.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// Stock line shown under the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLabel {
    OutOfStock,
    Left { count: u32, low: bool },
}

impl StockLabel {
    #[must_use]
    pub const fn for_stock(stock: u32) -> Self {
        if stock == 0 {
            Self::OutOfStock
        } else {
            Self::Left {
                count: stock,
                low: stock <= LOW_STOCK_THRESHOLD,
            }
        }
    }
}

impl fmt::Display for StockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfStock => write!(f, "Out of stock"),
            Self::Left { count, .. } => write!(f, "Only {count} left"),
        }
    }
}

/// Size and color picked for one product.
#[derive(Debug, Clone)]
pub struct VariantSelection {
    product_id: ProductId,
    variants: Vec<Variant>,
    size: Option<String>,
    color: Option<String>,
}

impl VariantSelection {
    /// Default selection: the first variant's size, then the first color for
    /// that size.
    #[must_use]
    pub fn new(product: &Product) -> Self {
        let mut selection = Self {
            product_id: product.id.clone(),
            variants: product.variants.clone(),
            size: None,
            color: None,
        };
        if let Some(first) = product.variants.first() {
            let size = first.size.clone();
            selection.apply_size(size);
        }
        selection
    }

    /// Distinct sizes in first-seen order.
    #[must_use]
    pub fn sizes(&self) -> Vec<&str> {
        let mut sizes: Vec<&str> = Vec::new();
        for variant in &self.variants {
            if !sizes.contains(&variant.size.as_str()) {
                sizes.push(&variant.size);
            }
        }
        sizes
    }

    /// Colors offered for the selected size.
    #[must_use]
    pub fn colors(&self) -> Vec<&str> {
        self.size
            .as_deref()
            .map(|size| self.colors_for(size))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Pick a size; the color resets to the first one available for it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if no variant has that size.
    pub fn select_size(&mut self, size: &str) -> Result<(), ClientError> {
        if !self.variants.iter().any(|v| v.size == size) {
            return Err(ClientError::NotFound(format!("size {size}")));
        }
        self.apply_size(size.to_string());
        Ok(())
    }

    /// Pick a color within the selected size.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the selected size has no such color.
    pub fn select_color(&mut self, color: &str) -> Result<(), ClientError> {
        if !self.colors().contains(&color) {
            return Err(ClientError::NotFound(format!("color {color}")));
        }
        self.color = Some(color.to_string());
        Ok(())
    }

    /// The variant matching the current size and color.
    #[must_use]
    pub fn variant(&self) -> Option<&Variant> {
        let (size, color) = (self.size.as_deref()?, self.color.as_deref()?);
        self.variants
            .iter()
            .find(|v| v.size == size && v.color == color)
    }

    /// Stock label for the current selection.
    #[must_use]
    pub fn stock_label(&self) -> Option<StockLabel> {
        self.variant().map(|v| StockLabel::for_stock(v.stock))
    }

    /// Whether add-to-cart is enabled.
    #[must_use]
    pub fn can_add_to_cart(&self) -> bool {
        self.variant().is_some_and(Variant::in_stock)
    }

    /// Cart line for the current selection, if it resolves.
    #[must_use]
    pub fn line_key(&self) -> Option<LineKey> {
        self.variant()
            .map(|v| LineKey::new(self.product_id.clone(), &v.size, &v.color))
    }

    /// Line key ready for add-to-cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoVariantSelected` if the selection does not
    /// resolve, or `ClientError::OutOfStock` if the variant has no stock.
    pub fn checked_line(&self) -> Result<LineKey, ClientError> {
        let variant = self.variant().ok_or(ClientError::NoVariantSelected)?;
        if !variant.in_stock() {
            return Err(ClientError::OutOfStock);
        }
        Ok(LineKey::new(
            self.product_id.clone(),
            &variant.size,
            &variant.color,
        ))
    }

    /// Whether the current selection is already a cart line.
    #[must_use]
    pub fn in_cart(&self, cart: &Cart) -> bool {
        self.line_key().is_some_and(|key| cart.contains(&key))
    }

    fn colors_for(&self, size: &str) -> Vec<&str> {
        let mut colors: Vec<&str> = Vec::new();
        for variant in self.variants.iter().filter(|v| v.size == size) {
            if !colors.contains(&variant.color.as_str()) {
                colors.push(&variant.color);
            }
        }
        colors
    }

    fn apply_size(&mut self, size: String) {
        let color = self.colors_for(&size).first().map(|c| (*c).to_string());
        self.color = color;
        self.size = Some(size);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(variants: serde_json::Value) -> Product {
        serde_json::from_value(serde_json::json!({
            "_id": "P1", "name": "Runner", "price": 500, "variants": variants
        }))
        .unwrap()
    }

    fn red_blue() -> Product {
        product(serde_json::json!([
            {"size": "M", "color": "Red", "stock": 0},
            {"size": "M", "color": "Blue", "stock": 3},
            {"size": "L", "color": "Black", "stock": 12},
            {"size": "M", "color": "Green", "stock": 7}
        ]))
    }

    #[test]
    fn test_default_selection_and_disabled_add() {
        let selection = VariantSelection::new(&red_blue());
        assert_eq!(selection.size(), Some("M"));
        assert_eq!(selection.color(), Some("Red"));
        assert!(!selection.can_add_to_cart());
        assert_eq!(selection.stock_label(), Some(StockLabel::OutOfStock));
        assert!(matches!(
            selection.checked_line(),
            Err(ClientError::OutOfStock)
        ));
    }

    #[test]
    fn test_choosing_stocked_color_enables_add() {
        let mut selection = VariantSelection::new(&red_blue());
        selection.select_color("Blue").unwrap();
        assert!(selection.can_add_to_cart());
        assert_eq!(
            selection.stock_label(),
            Some(StockLabel::Left { count: 3, low: true })
        );
        assert_eq!(selection.stock_label().unwrap().to_string(), "Only 3 left");
        let key = selection.checked_line().unwrap();
        assert_eq!(key.to_string(), "P1:M:Blue");
    }

    #[test]
    fn test_size_narrows_colors_in_order() {
        let mut selection = VariantSelection::new(&red_blue());
        assert_eq!(selection.sizes(), vec!["M", "L"]);
        assert_eq!(selection.colors(), vec!["Red", "Blue", "Green"]);

        selection.select_size("L").unwrap();
        assert_eq!(selection.colors(), vec!["Black"]);
        assert_eq!(selection.color(), Some("Black"));
        assert_eq!(
            selection.stock_label(),
            Some(StockLabel::Left { count: 12, low: false })
        );
    }

    #[test]
    fn test_changing_size_resets_color() {
        let mut selection = VariantSelection::new(&red_blue());
        selection.select_color("Green").unwrap();
        selection.select_size("L").unwrap();
        selection.select_size("M").unwrap();
        assert_eq!(selection.color(), Some("Red"));
    }

    #[test]
    fn test_unknown_choices_are_rejected() {
        let mut selection = VariantSelection::new(&red_blue());
        assert!(selection.select_size("XXL").is_err());
        assert!(selection.select_color("Black").is_err());
        assert_eq!(selection.size(), Some("M"));
    }

    #[test]
    fn test_product_without_variants() {
        let selection = VariantSelection::new(&product(serde_json::json!([])));
        assert!(selection.sizes().is_empty());
        assert!(selection.variant().is_none());
        assert!(matches!(
            selection.checked_line(),
            Err(ClientError::NoVariantSelected)
        ));
    }

    #[test]
    fn test_in_cart() {
        let mut selection = VariantSelection::new(&red_blue());
        selection.select_color("Blue").unwrap();
        let cart: Cart = serde_json::from_str(
            r#"{"items": [{"product": {"_id": "P1", "price": 500}, "quantity": 1, "size": "M", "color": "Blue"}]}"#,
        )
        .unwrap();
        assert!(selection.in_cart(&cart));
        selection.select_size("L").unwrap();
        assert!(!selection.in_cart(&cart));
    }
}
