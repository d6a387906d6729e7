//! Product listing: name search and price sort.

use std::str::FromStr;

use sole_society_core::Product;

/// Listing sort order. Sorting is stable, so equal prices keep backend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Backend order.
    #[default]
    Relevance,
    PriceLowToHigh,
    PriceHighToLow,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "relevance" | "default" => Ok(Self::Relevance),
            "lowtohigh" | "low-to-high" | "asc" | "price-asc" => Ok(Self::PriceLowToHigh),
            "hightolow" | "high-to-low" | "desc" | "price-desc" => Ok(Self::PriceHighToLow),
            other => Err(format!("invalid sort order: {other}")),
        }
    }
}

/// Client-side listing filter.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    /// Case-insensitive substring of the product name. Blank matches all.
    pub search: String,
    pub sort: SortOrder,
    pub featured_only: bool,
    pub new_arrivals_only: bool,
}

impl ListingFilter {
    /// Products that pass the filter, in display order.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let needle = self.search.trim().to_lowercase();

        let mut result: Vec<Product> = products
            .iter()
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .filter(|p| !self.featured_only || p.is_featured)
            .filter(|p| !self.new_arrivals_only || p.is_new_arrival)
            .cloned()
            .collect();

        match self.sort {
            SortOrder::Relevance => {}
            SortOrder::PriceLowToHigh => result.sort_by(|a, b| a.price.cmp(&b.price)),
            SortOrder::PriceHighToLow => result.sort_by(|a, b| b.price.cmp(&a.price)),
        }

        result
    }
}
