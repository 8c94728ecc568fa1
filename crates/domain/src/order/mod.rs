//! Order records and the payment/fulfilment state machine.

mod record;
mod state;
mod value_objects;

pub use record::Order;
pub use state::{OrderState, OrderTransition, PaymentState};
pub use value_objects::{AddressSnapshot, LineItem, Money, PaymentMethod, UnitKind};

use common::ProductId;
use thiserror::Error;

/// Errors that can occur when building or transitioning an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order has no line items.
    #[error("order has no items")]
    NoItems,

    /// A line item carries a non-positive quantity.
    #[error("invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A line item carries a non-positive unit price.
    #[error("invalid unit price for product {product_id}: {paise} paise")]
    InvalidPrice { product_id: ProductId, paise: i64 },

    /// The requested transition is not allowed from the order's current state.
    #[error("cannot {action} an order in state {order_state} (payment {payment_state})")]
    InvalidTransition {
        action: &'static str,
        order_state: OrderState,
        payment_state: PaymentState,
    },
}
