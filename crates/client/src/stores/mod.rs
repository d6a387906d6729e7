//! Client-side state stores.
//!
//! Each store is a cheap `Clone` handle over shared state and is owned by the
//! [`Storefront`](crate::Storefront) context:
//!
//! - [`session`] - who is signed in, persisted across runs
//! - [`cart`] - mirror of the server cart
//! - [`wishlist`] - liked products and the membership set
//! - [`orders`] - the user's orders and the delivery countdown
//!
//! [`inflight`] holds the per-key locks and request sequencing the stores use
//! to keep late responses from overwriting newer state.

pub mod cart;
pub mod countdown;
pub mod inflight;
pub mod orders;
pub mod session;
pub mod wishlist;

use tokio::task::JoinHandle;

pub use cart::CartStore;
pub use countdown::{DeliveryStatus, DeliveryView, format_mm_ss};
pub use orders::OrderStore;
pub use session::{SessionState, SessionStore};
pub use wishlist::{Wishlist, WishlistStore};

/// Owns a background task; dropping the handle aborts the task.
#[derive(Debug)]
pub struct TaskHandle {
    task: JoinHandle<()>,
}

impl TaskHandle {
    pub(crate) const fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// Whether the task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
