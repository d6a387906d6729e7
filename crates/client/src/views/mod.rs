//! View models.
//!
//! Pure state behind the storefront screens: listing filters, variant
//! selection, the checkout summary and the admin order board. Nothing here
//! performs I/O.

pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod variants;

pub use admin::AdminOrderBoard;
pub use catalog::{ListingFilter, SortOrder};
pub use checkout::{CheckoutSummary, SHIPPING_FEE_RUPEES};
pub use variants::{LOW_STOCK_THRESHOLD, StockLabel, VariantSelection};
