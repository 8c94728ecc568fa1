//! Gateway and checkout-flow error types.

use common::OrderId;
use domain::{OrderState, PaymentState};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in the payment flow.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The remote gateway call failed or timed out. The order is untouched
    /// and the call is safe to retry.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    /// The webhook signature did not match the payload.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// The webhook body was not a recognizable event.
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// No order with the given id belongs to the caller.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is not paid through the gateway.
    #[error("order {0} does not use gateway payment")]
    WrongPaymentMethod(OrderId),

    /// The order's payment already has an outcome; no new session can be
    /// opened for it.
    #[error("payment for order {0} is already settled")]
    AlreadySettled(OrderId),

    /// The event asks for a transition the order's current state forbids.
    #[error(
        "cannot apply event to order {order_id} in state {order_state} (payment {payment_state})"
    )]
    InvalidTransition {
        order_id: OrderId,
        payment_state: PaymentState,
        order_state: OrderState,
    },

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
