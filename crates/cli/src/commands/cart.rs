//! Cart and wishlist commands.

use sole_society_client::{Notification, Storefront};
use sole_society_core::{LineKey, ProductId};

use super::CliError;
use super::catalog::select;
use crate::output;

/// `sole cart show`
pub async fn show(storefront: &Storefront) {
    let cart = storefront.cart().cart().await;
    if cart.is_empty() {
        output::notify(&Notification::info("Your cart is empty"));
        return;
    }
    for item in &cart.items {
        let unavailable = if item.product.is_available() {
            ""
        } else {
            " (unavailable)"
        };
        output::line(format_args!(
            "{:>3} x {:<32} {:>4} / {:<10} {:>10}{unavailable}",
            item.quantity,
            item.product.name(),
            item.size,
            item.color,
            item.line_total()
        ));
    }
    let summary = storefront.checkout_summary().await;
    output::line(format_args!("Items:    {}", summary.item_count));
    output::line(format_args!("Subtotal: {}", summary.subtotal));
    output::line(format_args!("Shipping: {}", summary.shipping));
    output::line(format_args!("Total:    {}", summary.total));
}

/// `sole cart add <product>`
pub async fn add(
    storefront: &Storefront,
    product: &str,
    size: Option<&str>,
    color: Option<&str>,
    quantity: u32,
) -> Result<(), CliError> {
    let product = storefront.product(&ProductId::new(product)).await?;
    let selection = select(&product, size, color)?;
    let cart = storefront.add_to_cart(&selection, quantity).await?;
    output::notify(&Notification::success(format!(
        "Added to cart! {} item(s) in cart",
        cart.item_count()
    )));
    Ok(())
}

/// `sole cart set`
pub async fn set(storefront: &Storefront, key: &LineKey, quantity: u32) -> Result<(), CliError> {
    let cart = storefront.cart().set_quantity(key, quantity).await?;
    report_line(&cart, key);
    Ok(())
}

/// `sole cart inc`
pub async fn increment(storefront: &Storefront, key: &LineKey) -> Result<(), CliError> {
    let cart = storefront.cart().increment(key).await?;
    report_line(&cart, key);
    Ok(())
}

/// `sole cart dec`
pub async fn decrement(storefront: &Storefront, key: &LineKey) -> Result<(), CliError> {
    let cart = storefront.cart().decrement(key).await?;
    report_line(&cart, key);
    Ok(())
}

/// `sole cart remove`
pub async fn remove(storefront: &Storefront, key: &LineKey) -> Result<(), CliError> {
    storefront.cart().remove(key).await?;
    output::notify(&Notification::success("Removed from cart"));
    Ok(())
}

/// `sole wishlist show`
pub async fn show_wishlist(storefront: &Storefront) {
    let wishlist = storefront.wishlist().wishlist().await;
    if wishlist.is_empty() {
        output::notify(&Notification::info("Your wishlist is empty"));
        return;
    }
    for product in wishlist.products() {
        output::line(format_args!(
            "{:<26} {:<36} {:>10}",
            product.id, product.name, product.price
        ));
    }
}

/// `sole wishlist toggle <product>`
pub async fn toggle_wishlist(storefront: &Storefront, product: &str) -> Result<(), CliError> {
    let liked = storefront.toggle_wishlist(&ProductId::new(product)).await?;
    let message = if liked {
        "Added to wishlist"
    } else {
        "Removed from wishlist"
    };
    output::notify(&Notification::success(message));
    Ok(())
}

fn report_line(cart: &sole_society_core::Cart, key: &LineKey) {
    match cart.line(key) {
        Some(item) => output::line(format_args!("{key}: quantity {}", item.quantity)),
        None => output::notify(&Notification::warning(format!("{key} is not in the cart"))),
    }
}
