//! Admin commands.
//!
//! # Usage
//!
//! ```bash
//! sole admin orders --pending
//! sole admin deliver 66a0c3e1f2
//! sole admin create-product --name "Court Classic" --price 2499 \
//!     --variant 8:White:12 --variant 9:White:4 --image court.png
//! ```

use sole_society_client::validation::{ProductForm, VariantInput};
use sole_society_client::{Notification, Storefront};
use sole_society_core::{OrderId, ProductId};

use super::{CliError, read_image};
use crate::ProductArgs;
use crate::output;

/// Parse a `SIZE:COLOR:STOCK` variant argument.
///
/// # Errors
///
/// Returns a message when the shape or the stock number is wrong. Negative
/// stock parses so that form validation can report it.
pub fn parse_variant(raw: &str) -> Result<VariantInput, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(size), Some(color), Some(stock)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected SIZE:COLOR:STOCK, got {raw:?}"));
    };
    let stock = stock
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid stock {stock:?}: {e}"))?;
    Ok(VariantInput {
        size: size.to_string(),
        color: color.to_string(),
        stock,
    })
}

/// `sole admin orders`
pub async fn orders(storefront: &Storefront, pending_only: bool) -> Result<(), CliError> {
    let board = storefront.admin_orders().await?;
    let orders: Vec<_> = if pending_only {
        board.pending().collect()
    } else {
        board.orders().iter().collect()
    };
    if orders.is_empty() {
        output::notify(&Notification::info("No orders"));
        return Ok(());
    }
    for order in orders {
        let customer = order
            .user
            .as_ref()
            .map_or("unknown", |u| u.username.as_str());
        output::line(format_args!(
            "{:<26} {:<16} {:>10} {}",
            order.id, customer, order.total_price, order.status
        ));
    }
    output::line(format_args!(
        "Delivered revenue: {}",
        board.delivered_revenue()
    ));
    Ok(())
}

/// `sole admin deliver <order>`
pub async fn deliver(storefront: &Storefront, order: &str) -> Result<(), CliError> {
    let mut board = storefront.admin_orders().await?;
    let order = storefront
        .admin_deliver(&mut board, &OrderId::new(order))
        .await?;
    output::notify(&Notification::success(format!(
        "Order #{} marked delivered",
        order.id.short()
    )));
    Ok(())
}

/// `sole admin cancel <order>`
pub async fn cancel(storefront: &Storefront, order: &str) -> Result<(), CliError> {
    let mut board = storefront.admin_orders().await?;
    let order = storefront
        .admin_cancel(&mut board, &OrderId::new(order))
        .await?;
    output::notify(&Notification::success(format!(
        "Order #{} cancelled",
        order.id.short()
    )));
    Ok(())
}

/// `sole admin create-product`
pub async fn create_product(storefront: &Storefront, args: ProductArgs) -> Result<(), CliError> {
    let form = into_form(args).await?;
    let product = storefront.admin_create_product(&form).await?;
    let message = product.map_or_else(
        || "Product created".to_string(),
        |p| format!("Product created: {} ({})", p.name, p.id),
    );
    output::notify(&Notification::success(message));
    Ok(())
}

/// `sole admin update-product <id>`
pub async fn update_product(
    storefront: &Storefront,
    id: &str,
    args: ProductArgs,
) -> Result<(), CliError> {
    let form = into_form(args).await?;
    storefront
        .admin_update_product(&ProductId::new(id), &form)
        .await?;
    output::notify(&Notification::success("Product updated"));
    Ok(())
}

/// `sole admin delete-product <id>`
pub async fn delete_product(storefront: &Storefront, id: &str) -> Result<(), CliError> {
    storefront.admin_delete_product(&ProductId::new(id)).await?;
    output::notify(&Notification::success("Product deleted"));
    Ok(())
}

async fn into_form(args: ProductArgs) -> Result<ProductForm, CliError> {
    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        images.push(read_image(path).await?);
    }
    Ok(ProductForm {
        name: args.name,
        brand: args.brand,
        category: args.category,
        kind: args.kind,
        description: args.description,
        price: args.price,
        original_price: args.original_price,
        discount: args.discount,
        variants: args.variants,
        images,
        is_featured: args.featured,
        is_new_arrival: args.new_arrival,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variant() {
        assert_eq!(
            parse_variant("M:Red:5").unwrap(),
            VariantInput {
                size: "M".to_string(),
                color: "Red".to_string(),
                stock: 5
            }
        );
        assert_eq!(parse_variant("9:Off White:-1").unwrap().stock, -1);
    }

    #[test]
    fn test_parse_variant_rejects_bad_shapes() {
        assert!(parse_variant("M:Red").is_err());
        assert!(parse_variant("M:Red:many").is_err());
    }
}
