//! Sole Society Client - storefront API client and client-side state.
//!
//! # Modules
//!
//! - [`api`] - HTTP client for the backend REST API with one silent
//!   refresh-and-retry on 401
//! - [`stores`] - session, cart, wishlist and order stores
//! - [`views`] - listing, variant, checkout and admin view models
//! - [`storefront`] - the [`Storefront`] context owning all of the above
//! - [`validation`] - form checks run before any request
//! - [`notify`] - errors as user-facing notifications
//!
//! # Example
//!
//! ```no_run
//! use sole_society_client::{ClientConfig, SessionStorage, Storefront};
//!
//! # async fn run() -> Result<(), sole_society_client::ClientError> {
//! let config = ClientConfig::from_env()?;
//! let storefront = Storefront::new(&config, SessionStorage::file(&config.session_file))?;
//! storefront.start().await;
//! let cart = storefront.cart().cart().await;
//! println!("{} items", cart.item_count());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod assets;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod storefront;
pub mod stores;
pub mod validation;
pub mod views;

pub use api::{ApiClient, ImageUpload, ProductQuery};
pub use assets::AssetResolver;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ClientError, Result};
pub use notify::{Level, Notification};
pub use storage::SessionStorage;
pub use storefront::Storefront;
pub use stores::{SessionState, TaskHandle};
