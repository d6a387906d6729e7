//! Catalog browsing and reviews.

use rust_decimal::Decimal;
use sole_society_client::views::{ListingFilter, VariantSelection};
use sole_society_client::validation::ReviewForm;
use sole_society_client::{Notification, ProductQuery, Storefront};
use sole_society_core::{Product, ProductId};

use super::CliError;
use crate::ListArgs;
use crate::output;

/// `sole products`
pub async fn list(storefront: &Storefront, args: ListArgs) -> Result<(), CliError> {
    let query = args
        .category
        .map_or_else(ProductQuery::default, ProductQuery::category);
    let filter = ListingFilter {
        search: args.search.unwrap_or_default(),
        sort: args.sort,
        featured_only: args.featured,
        new_arrivals_only: args.new_arrivals,
    };

    let products = storefront.products(&query, &filter).await?;
    if products.is_empty() {
        output::notify(&Notification::info("No products found"));
        return Ok(());
    }

    for product in &products {
        let liked = if storefront.wishlist().contains(&product.id).await {
            "♥"
        } else {
            " "
        };
        output::line(format_args!(
            "{liked} {:<26} {:<36} {:>10}",
            product.id, product.name, product.price
        ));
    }
    Ok(())
}

/// `sole product <id>`
pub async fn show(
    storefront: &Storefront,
    id: &str,
    size: Option<&str>,
    color: Option<&str>,
) -> Result<(), CliError> {
    let product = storefront.product(&ProductId::new(id)).await?;
    let selection = select(&product, size, color)?;

    output::line(format_args!("{} ({})", product.name, product.brand));
    match product.original_price {
        Some(original) if product.discount > Decimal::ZERO => output::line(format_args!(
            "Price: {}  was {original}, {}% off",
            product.price,
            product.discount.normalize()
        )),
        _ => output::line(format_args!("Price: {}", product.price)),
    }
    output::line(format_args!(
        "Rating: {:.1} ({} reviews)",
        product.rating,
        product.reviews.len()
    ));
    output::line(format_args!(
        "Image: {}",
        storefront.assets().first(&product.images)
    ));
    if !product.description.is_empty() {
        output::line(&product.description);
    }

    output::line(format_args!("Sizes: {}", selection.sizes().join(", ")));
    output::line(format_args!("Colors: {}", selection.colors().join(", ")));
    match (selection.size(), selection.color(), selection.stock_label()) {
        (Some(size), Some(color), Some(label)) => {
            output::line(format_args!("Selected: {size} / {color}, {label}"));
        }
        _ => output::notify(&Notification::warning("No variants available")),
    }
    if selection.in_cart(&storefront.cart().cart().await) {
        output::notify(&Notification::info("Already in your cart"));
    }

    for review in &product.reviews {
        output::line(format_args!(
            "  {} {}",
            stars(review.rating),
            review.comment
        ));
    }
    Ok(())
}

/// `sole review submit <product>`
pub async fn review(
    storefront: &Storefront,
    product: &str,
    rating: u8,
    comment: String,
) -> Result<(), CliError> {
    let form = ReviewForm { rating, comment };
    let product = storefront
        .submit_review(&ProductId::new(product), &form)
        .await?;
    output::notify(&Notification::success(format!(
        "Review saved. {} now rated {:.1}",
        product.name, product.rating
    )));
    Ok(())
}

/// `sole review delete <product>`
pub async fn delete_review(storefront: &Storefront, product: &str) -> Result<(), CliError> {
    storefront.delete_review(&ProductId::new(product)).await?;
    output::notify(&Notification::success("Review deleted"));
    Ok(())
}

/// Variant selection with optional size and color picks applied.
pub fn select(
    product: &Product,
    size: Option<&str>,
    color: Option<&str>,
) -> Result<VariantSelection, CliError> {
    let mut selection = VariantSelection::new(product);
    if let Some(size) = size {
        selection.select_size(size)?;
    }
    if let Some(color) = color {
        selection.select_color(color)?;
    }
    Ok(selection)
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stars() {
        assert_eq!(stars(4), "★★★★☆");
        assert_eq!(stars(0), "☆☆☆☆☆");
        assert_eq!(stars(9), "★★★★★");
    }

    #[test]
    fn test_select_applies_picks() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "_id": "P1", "name": "Runner", "price": 500,
            "variants": [
                {"size": "M", "color": "Red", "stock": 0},
                {"size": "M", "color": "Blue", "stock": 3}
            ]
        }))
        .unwrap();
        let selection = select(&product, Some("M"), Some("Blue")).unwrap();
        assert!(selection.can_add_to_cart());
        assert!(select(&product, Some("XL"), None).is_err());
    }
}
