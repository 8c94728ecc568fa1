//! Order state machine.

use serde::{Deserialize, Serialize};

/// Fulfilment state of an order.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed (cash on delivery, immediate)
///           │
///           ├──► Processing ──► Shipped ──► Delivered
///           │    (payment captured)
///           │
/// Pending/Confirmed ──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    /// Order exists, payment outcome (or confirmation) still outstanding.
    #[default]
    Pending,

    /// Cash-on-delivery order accepted, awaiting fulfilment.
    Confirmed,

    /// Payment captured, order is being prepared.
    Processing,

    /// Order has left the warehouse.
    Shipped,

    /// Order reached the customer (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderState {
    /// Returns true if the order can still be cancelled by its owner.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderState::Pending | OrderState::Confirmed)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Cancelled)
    }

    /// Returns the state name as stored and served on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::Confirmed => "confirmed",
            OrderState::Processing => "processing",
            OrderState::Shipped => "shipped",
            OrderState::Delivered => "delivered",
            OrderState::Cancelled => "cancelled",
        }
    }

    /// Parses a stored state name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderState::Pending),
            "confirmed" => Some(OrderState::Confirmed),
            "processing" => Some(OrderState::Processing),
            "shipped" => Some(OrderState::Shipped),
            "delivered" => Some(OrderState::Delivered),
            "cancelled" => Some(OrderState::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state, orthogonal to the fulfilment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    /// No payment outcome recorded yet. Cash-on-delivery orders stay here
    /// until settled offline.
    #[default]
    Pending,

    /// Funds were captured by the gateway.
    Completed,

    /// The gateway reported a failed payment.
    Failed,
}

impl PaymentState {
    /// Returns true once a payment outcome has been recorded.
    pub fn is_settled(&self) -> bool {
        !matches!(self, PaymentState::Pending)
    }

    /// Returns the state name as stored and served on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
        }
    }

    /// Parses a stored state name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentState::Pending),
            "completed" => Some(PaymentState::Completed),
            "failed" => Some(PaymentState::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A guarded change to an order's payment and fulfilment state.
///
/// Each transition names the state it expects to find. Stores apply
/// transitions with compare-and-set semantics: the guard is evaluated inside
/// the same atomic update that writes the new state, so a transition can
/// never be applied twice with different outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTransition {
    /// Verified capture event: payment pending → completed, order → processing.
    PaymentCaptured { payment_ref: String },

    /// Verified failure event: payment pending → failed. The order stays
    /// pending; the owner retries with a new order.
    PaymentFailed,

    /// Owner-requested cancellation, allowed only while pending or confirmed.
    Cancel,
}

impl OrderTransition {
    /// Returns the action name used in errors and logs.
    pub fn action(&self) -> &'static str {
        match self {
            OrderTransition::PaymentCaptured { .. } => "capture payment for",
            OrderTransition::PaymentFailed => "fail payment for",
            OrderTransition::Cancel => "cancel",
        }
    }

    /// Returns true if the transition may be applied to an order in the
    /// given states.
    pub fn guard(&self, payment_state: PaymentState, order_state: OrderState) -> bool {
        match self {
            OrderTransition::PaymentCaptured { .. } | OrderTransition::PaymentFailed => {
                payment_state == PaymentState::Pending && order_state == OrderState::Pending
            }
            OrderTransition::Cancel => order_state.can_cancel(),
        }
    }

    /// Returns true when the given states show this transition has already
    /// been applied, so a repeat delivery can be answered as a no-op.
    pub fn already_applied(&self, payment_state: PaymentState, order_state: OrderState) -> bool {
        match self {
            OrderTransition::PaymentCaptured { .. } => payment_state == PaymentState::Completed,
            OrderTransition::PaymentFailed => payment_state == PaymentState::Failed,
            OrderTransition::Cancel => order_state == OrderState::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_states() {
        assert_eq!(OrderState::default(), OrderState::Pending);
        assert_eq!(PaymentState::default(), PaymentState::Pending);
    }

    #[test]
    fn test_can_cancel_only_before_processing() {
        assert!(OrderState::Pending.can_cancel());
        assert!(OrderState::Confirmed.can_cancel());
        assert!(!OrderState::Processing.can_cancel());
        assert!(!OrderState::Shipped.can_cancel());
        assert!(!OrderState::Delivered.can_cancel());
        assert!(!OrderState::Cancelled.can_cancel());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderState::Pending.is_terminal());
        assert!(!OrderState::Confirmed.is_terminal());
        assert!(!OrderState::Processing.is_terminal());
        assert!(!OrderState::Shipped.is_terminal());
        assert!(OrderState::Delivered.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
    }

    #[test]
    fn test_payment_settled() {
        assert!(!PaymentState::Pending.is_settled());
        assert!(PaymentState::Completed.is_settled());
        assert!(PaymentState::Failed.is_settled());
    }

    #[test]
    fn test_capture_guard_requires_pending_payment() {
        let capture = OrderTransition::PaymentCaptured {
            payment_ref: "pay_1".into(),
        };
        assert!(capture.guard(PaymentState::Pending, OrderState::Pending));
        assert!(!capture.guard(PaymentState::Completed, OrderState::Processing));
        assert!(!capture.guard(PaymentState::Failed, OrderState::Pending));
        // COD orders are confirmed, never capturable.
        assert!(!capture.guard(PaymentState::Pending, OrderState::Confirmed));
    }

    #[test]
    fn test_cancel_guard_follows_order_state() {
        assert!(OrderTransition::Cancel.guard(PaymentState::Pending, OrderState::Pending));
        assert!(OrderTransition::Cancel.guard(PaymentState::Pending, OrderState::Confirmed));
        assert!(!OrderTransition::Cancel.guard(PaymentState::Completed, OrderState::Processing));
        assert!(!OrderTransition::Cancel.guard(PaymentState::Pending, OrderState::Cancelled));
    }

    #[test]
    fn test_already_applied_detection() {
        let capture = OrderTransition::PaymentCaptured {
            payment_ref: "pay_1".into(),
        };
        assert!(capture.already_applied(PaymentState::Completed, OrderState::Processing));
        // Fulfilment may have moved on; idempotency keys on the payment state.
        assert!(capture.already_applied(PaymentState::Completed, OrderState::Shipped));
        assert!(!capture.already_applied(PaymentState::Pending, OrderState::Pending));
        assert!(!capture.already_applied(PaymentState::Failed, OrderState::Pending));

        assert!(OrderTransition::PaymentFailed.already_applied(
            PaymentState::Failed,
            OrderState::Pending
        ));
        assert!(
            OrderTransition::Cancel.already_applied(PaymentState::Pending, OrderState::Cancelled)
        );
    }

    #[test]
    fn test_display_and_parse_roundtrip() {
        for state in [
            OrderState::Pending,
            OrderState::Confirmed,
            OrderState::Processing,
            OrderState::Shipped,
            OrderState::Delivered,
            OrderState::Cancelled,
        ] {
            assert_eq!(OrderState::parse(state.as_str()), Some(state));
        }
        assert_eq!(OrderState::parse("unknown"), None);

        for state in [
            PaymentState::Pending,
            PaymentState::Completed,
            PaymentState::Failed,
        ] {
            assert_eq!(PaymentState::parse(state.as_str()), Some(state));
        }
        assert_eq!(PaymentState::parse(""), None);
    }

    #[test]
    fn test_serialization_uses_wire_names() {
        let json = serde_json::to_string(&OrderState::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let state: PaymentState = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(state, PaymentState::Completed);
    }
}
