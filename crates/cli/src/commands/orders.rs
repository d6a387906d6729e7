//! Checkout and order tracking.

use chrono::Utc;

use sole_society_client::stores::DeliveryView;
use sole_society_client::{Notification, Storefront};
use sole_society_core::ShippingAddress;

use super::CliError;
use crate::output;

/// `sole checkout`
pub async fn checkout(storefront: &Storefront, address: ShippingAddress) -> Result<(), CliError> {
    let summary = storefront.checkout_summary().await;
    let order = storefront.place_order(&address).await?;

    let reference = order.map_or_else(String::new, |o| format!(" #{}", o.id.short()));
    output::notify(&Notification::success(format!(
        "Order{reference} placed! Total {}",
        summary.total
    )));
    Ok(())
}

/// `sole orders [--watch]`
pub async fn show(storefront: &Storefront, watch: bool) -> Result<(), CliError> {
    if !storefront.session().is_authenticated() {
        return Err(sole_society_client::ClientError::NotAuthenticated.into());
    }
    let orders = storefront.orders().orders().await;
    if orders.is_empty() {
        output::notify(&Notification::info("No orders yet"));
        return Ok(());
    }
    for order in &orders {
        output::line(format_args!(
            "#{} {:>10} {:>3} item(s) {}",
            order.id.short(),
            order.total_price,
            order.unit_count(),
            order.status
        ));
    }

    if !watch {
        print_board(&storefront.orders().tick(Utc::now()).await);
        return Ok(());
    }

    let mut board = storefront.orders().subscribe();
    let _countdown = storefront.orders().start_countdown();
    loop {
        tokio::select! {
            changed = board.changed() => {
                if changed.is_err() {
                    break;
                }
                print_board(&board.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn print_board(board: &[DeliveryView]) {
    for view in board {
        output::line(format_args!("#{} {}", view.order_id.short(), view.status));
    }
}
