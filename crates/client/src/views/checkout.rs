//! Checkout summary.

use sole_society_core::{Cart, Price};

/// Flat shipping charged on any non-empty order.
pub const SHIPPING_FEE_RUPEES: i64 = 99;

/// Totals shown before placing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub item_count: u32,
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
}

impl CheckoutSummary {
    /// Summarize a cart. Lines without an embedded price count as zero.
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        let subtotal = cart.subtotal();
        let shipping = if subtotal.is_positive() {
            Price::from_rupees(SHIPPING_FEE_RUPEES)
        } else {
            Price::ZERO
        };
        Self {
            item_count: cart.item_count(),
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }
}
