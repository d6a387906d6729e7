//! Delivery countdown.
//!
//! Each pending order with a deadline shows time remaining as `MM:SS`. When
//! the deadline passes the order is *awaiting confirmation* until the backend
//! acknowledges delivery.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use sole_society_core::{Order, OrderId, OrderStatus};

/// What the user should see for an order's delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Pending with no deadline.
    Processing,
    /// Pending, this long left.
    Countdown(Duration),
    /// Deadline passed; waiting for the backend to confirm.
    AwaitingConfirmation,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    /// Status of `order` at `now`, given whether it is already awaiting
    /// confirmation locally.
    #[must_use]
    pub fn of(order: &Order, now: DateTime<Utc>, awaiting: bool) -> Self {
        match order.status {
            OrderStatus::Delivered => Self::Delivered,
            OrderStatus::Cancelled => Self::Cancelled,
            OrderStatus::Pending if order.is_delivered => Self::Delivered,
            OrderStatus::Pending if awaiting => Self::AwaitingConfirmation,
            OrderStatus::Pending => match remaining(order, now) {
                None => Self::Processing,
                Some(left) if left.is_zero() => Self::AwaitingConfirmation,
                Some(left) => Self::Countdown(left),
            },
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "Processing"),
            Self::Countdown(left) => write!(f, "Arriving in {}", format_mm_ss(*left)),
            Self::AwaitingConfirmation => write!(f, "Awaiting confirmation"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One row of the countdown board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryView {
    pub order_id: OrderId,
    pub status: DeliveryStatus,
}

/// Time left before the deadline, saturating at zero. `None` without one.
#[must_use]
pub fn remaining(order: &Order, now: DateTime<Utc>) -> Option<Duration> {
    order
        .delivery_time
        .map(|deadline| (deadline - now).to_std().unwrap_or(Duration::ZERO))
}

/// Whether a pending order's deadline has passed.
#[must_use]
pub fn is_due(order: &Order, now: DateTime<Utc>) -> bool {
    order.status == OrderStatus::Pending
        && !order.is_delivered
        && order.delivery_time.is_some_and(|deadline| deadline <= now)
}

/// `MM:SS`, rounding partial seconds down. Minutes are not capped at 59.
#[must_use]
pub fn format_mm_ss(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn order(status: &str, deadline_ms: Option<i64>) -> Order {
        let mut json = serde_json::json!({"_id": "O1", "totalPrice": 100, "status": status});
        if let Some(ms) = deadline_ms {
            json["deliveryTime"] = serde_json::json!(ms);
        }
        serde_json::from_value(json).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_format_mm_ss() {
        assert_eq!(format_mm_ss(Duration::from_secs(0)), "00:00");
        assert_eq!(format_mm_ss(Duration::from_secs(299)), "04:59");
        assert_eq!(format_mm_ss(Duration::from_millis(61_900)), "01:01");
        assert_eq!(format_mm_ss(Duration::from_secs(6000)), "100:00");
    }

    #[test]
    fn test_countdown_before_deadline() {
        let order = order("Pending", Some(1_000_000));
        let status = DeliveryStatus::of(&order, at(700_000), false);
        assert_eq!(status, DeliveryStatus::Countdown(Duration::from_secs(300)));
        assert_eq!(status.to_string(), "Arriving in 05:00");
        assert!(!is_due(&order, at(700_000)));
    }

    #[test]
    fn test_expired_pending_is_awaiting_not_delivered() {
        let order = order("Pending", Some(1_000_000));
        assert!(is_due(&order, at(1_000_000)));
        assert_eq!(
            DeliveryStatus::of(&order, at(1_500_000), false),
            DeliveryStatus::AwaitingConfirmation
        );
        assert_eq!(remaining(&order, at(1_500_000)), Some(Duration::ZERO));
    }

    #[test]
    fn test_terminal_and_undated_orders() {
        assert_eq!(
            DeliveryStatus::of(&order("Delivered", Some(0)), at(5), false),
            DeliveryStatus::Delivered
        );
        assert_eq!(
            DeliveryStatus::of(&order("Cancelled", Some(10)), at(5), false),
            DeliveryStatus::Cancelled
        );
        assert_eq!(
            DeliveryStatus::of(&order("Pending", None), at(5), false),
            DeliveryStatus::Processing
        );
        assert!(!is_due(&order("Cancelled", Some(0)), at(5)));
    }
}
