//! Core types for Sole Society.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! JSON models returned by the backend.

pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;
pub mod user;

pub use cart::{Cart, CartItem, CartProduct, LineKey, ProductRef};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderCustomer, OrderItem, ShippingAddress};
pub use price::Price;
pub use product::{Product, Review, ReviewAuthor, Variant};
pub use status::*;
pub use user::User;
