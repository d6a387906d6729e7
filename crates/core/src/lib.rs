//! Sole Society Core - Shared domain types.
//!
//! This crate provides the types exchanged with the storefront backend:
//! - users, products, variants and reviews
//! - carts, wishlists and orders
//! - newtype IDs, prices, emails and status enums
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients. The `sole-society-client` crate builds the API client and the
//! client-side stores on top of it.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers and wire models for the backend REST API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
