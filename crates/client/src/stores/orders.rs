//! Order store with the delivery countdown.
//!
//! A once-a-second tick recomputes every order's [`DeliveryStatus`]. Orders
//! whose deadline passed are held as awaiting confirmation and a delivery
//! patch is sent; only the backend's acknowledgement flips them to
//! Delivered. Failed patches are retried no sooner than the configured
//! back-off.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use sole_society_core::{Order, OrderId, OrderStatus};

use super::TaskHandle;
use super::countdown::{DeliveryStatus, DeliveryView, is_due};
use super::inflight::{Sequencer, Versioned};
use super::session::{SessionState, SessionStore};
use crate::api::ApiClient;
use crate::error::Result;

const TICK: Duration = Duration::from_secs(1);

/// Shared handle to the user's orders.
#[derive(Clone)]
pub struct OrderStore {
    inner: Arc<OrdersInner>,
}

struct OrdersInner {
    api: ApiClient,
    session: SessionStore,
    state: RwLock<OrdersState>,
    seq: Sequencer,
    retry: Duration,
    board: watch::Sender<Vec<DeliveryView>>,
}

#[derive(Default)]
struct OrdersState {
    orders: Versioned<Vec<Order>>,
    /// Orders past their deadline, with the time of the last confirmation
    /// attempt (`None` before the first).
    awaiting: HashMap<OrderId, Option<DateTime<Utc>>>,
}

impl OrdersState {
    fn board(&self, now: DateTime<Utc>) -> Vec<DeliveryView> {
        self.orders
            .get()
            .iter()
            .map(|order| DeliveryView {
                order_id: order.id.clone(),
                status: DeliveryStatus::of(order, now, self.awaiting.contains_key(&order.id)),
            })
            .collect()
    }
}

impl OrderStore {
    /// `retry` is the minimum gap between confirmation attempts per order.
    #[must_use]
    pub fn new(api: ApiClient, session: SessionStore, retry: Duration) -> Self {
        let (board, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(OrdersInner {
                api,
                session,
                state: RwLock::new(OrdersState::default()),
                seq: Sequencer::new(),
                retry,
                board,
            }),
        }
    }

    /// Snapshot of the orders.
    pub async fn orders(&self) -> Vec<Order> {
        self.inner.state.read().await.orders.get().clone()
    }

    /// One order by id.
    pub async fn order(&self, id: &OrderId) -> Option<Order> {
        self.inner
            .state
            .read()
            .await
            .orders
            .get()
            .iter()
            .find(|o| o.id == *id)
            .cloned()
    }

    /// Receive the countdown board after every tick.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<DeliveryView>> {
        self.inner.board.subscribe()
    }

    /// Current delivery status of every order.
    pub async fn board(&self, now: DateTime<Utc>) -> Vec<DeliveryView> {
        self.inner.state.read().await.board(now)
    }

    /// Follow an identity change: refetch for a user, empty otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the refetch fails.
    pub async fn on_identity_change(&self, state: &SessionState) -> Result<Vec<Order>> {
        match state {
            SessionState::Authenticated(_) => self.refresh().await,
            SessionState::Unknown | SessionState::Anonymous => {
                self.clear_local().await;
                Ok(Vec::new())
            }
        }
    }

    /// Refetch the orders.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the request fails; previous orders are
    /// kept.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<Order>> {
        if !self.inner.session.is_authenticated() {
            self.clear_local().await;
            return Ok(Vec::new());
        }
        let seq = self.inner.seq.next();
        let orders = self.inner.api.orders().await?;

        let mut state = self.inner.state.write().await;
        if !state.orders.apply(seq, orders) {
            debug!(seq, "Dropping stale orders response");
        }
        let still_pending: Vec<OrderId> = state
            .orders
            .get()
            .iter()
            .filter(|o| o.status == OrderStatus::Pending && !o.is_delivered)
            .map(|o| o.id.clone())
            .collect();
        state.awaiting.retain(|id, _| still_pending.contains(id));
        Ok(state.orders.get().clone())
    }

    /// Forget all orders locally.
    pub async fn clear_local(&self) {
        let seq = self.inner.seq.next();
        let mut state = self.inner.state.write().await;
        state.orders.apply(seq, Vec::new());
        state.awaiting.clear();
        drop(state);
        self.inner.board.send_replace(Vec::new());
    }

    /// Advance the countdown to `now`.
    ///
    /// Newly expired orders become awaiting confirmation. Every awaiting
    /// order whose last attempt is older than the back-off gets a delivery
    /// patch; acknowledged ones become Delivered. Returns the updated board,
    /// which is also published to subscribers.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<DeliveryView> {
        let due = self.collect_due(now).await;

        for id in due {
            match self.inner.api.confirm_delivery(&id).await {
                Ok(_) => self.mark_delivered(&id).await,
                Err(e) => {
                    warn!(order_id = %id, error = %e, "Delivery confirmation failed, will retry");
                }
            }
        }

        let board = self.inner.state.read().await.board(now);
        self.inner.board.send_replace(board.clone());
        board
    }

    /// Run [`tick`](Self::tick) every second until the handle is dropped.
    #[must_use = "the countdown stops when the handle is dropped"]
    pub fn start_countdown(&self) -> TaskHandle {
        let store = self.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                store.tick(Utc::now()).await;
            }
        });
        TaskHandle::new(task)
    }

    /// Ids to confirm now, recording the attempt.
    async fn collect_due(&self, now: DateTime<Utc>) -> Vec<OrderId> {
        let retry = chrono::Duration::from_std(self.inner.retry).unwrap_or(chrono::Duration::MAX);
        let mut state = self.inner.state.write().await;
        let OrdersState { orders, awaiting } = &mut *state;

        let mut due = Vec::new();
        for order in orders.get().iter().filter(|o| is_due(o, now)) {
            let last_attempt = awaiting.entry(order.id.clone()).or_insert_with(|| {
                info!(order_id = %order.id, "Delivery deadline passed, awaiting confirmation");
                None
            });
            let ready = last_attempt.is_none_or(|at| now.signed_duration_since(at) >= retry);
            if ready {
                *last_attempt = Some(now);
                due.push(order.id.clone());
            }
        }
        due
    }

    async fn mark_delivered(&self, id: &OrderId) {
        let mut state = self.inner.state.write().await;
        state.awaiting.remove(id);

        let seq = self.inner.seq.next();
        let mut orders = state.orders.get().clone();
        if let Some(order) = orders.iter_mut().find(|o| o.id == *id) {
            if let Err(e) = order.set_status(OrderStatus::Delivered) {
                debug!(order_id = %id, error = %e, "Order already final");
            } else {
                info!(order_id = %id, "Delivery confirmed");
            }
        }
        state.orders.apply(seq, orders);
    }
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore")
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}
