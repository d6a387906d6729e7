//! Admin order board.
//!
//! Holds the store-wide order list and applies fulfillment actions locally
//! once the backend has accepted them. Status only moves forward.

use sole_society_core::{Order, OrderId, OrderStatus, Price};

use crate::error::ClientError;

/// Store-wide orders as seen by an admin.
#[derive(Debug, Clone, Default)]
pub struct AdminOrderBoard {
    orders: Vec<Order>,
}

impl AdminOrderBoard {
    #[must_use]
    pub const fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == *id)
    }

    /// Orders still awaiting fulfillment.
    pub fn pending(&self) -> impl Iterator<Item = &Order> {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending && !o.is_delivered)
    }

    /// Revenue across delivered orders.
    #[must_use]
    pub fn delivered_revenue(&self) -> Price {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Delivered || o.is_delivered)
            .map(|o| o.total_price)
            .sum()
    }

    /// Apply a status the backend accepted.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` for an unknown order, or
    /// `ClientError::StatusTransition` if the change would move backwards.
    pub fn apply_status(&mut self, id: &OrderId, status: OrderStatus) -> Result<&Order, ClientError> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == *id)
            .ok_or_else(|| ClientError::NotFound(format!("order {}", id.short())))?;
        order.set_status(status)?;
        Ok(order)
    }

    /// Check a change before sending it to the backend.
    ///
    /// # Errors
    ///
    /// Same as [`apply_status`](Self::apply_status).
    pub fn check_transition(&self, id: &OrderId, status: OrderStatus) -> Result<(), ClientError> {
        let order = self
            .get(id)
            .ok_or_else(|| ClientError::NotFound(format!("order {}", id.short())))?;
        order.status.transition(status)?;
        Ok(())
    }
}
