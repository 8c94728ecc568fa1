//! The order record.

use chrono::{DateTime, Utc};
use common::{OrderId, OwnerId};
use serde::{Deserialize, Serialize};

use super::{
    AddressSnapshot, LineItem, Money, OrderError, OrderState, OrderTransition, PaymentMethod,
    PaymentState,
};

/// An order as kept in the ledger.
///
/// Line items and the shipping address are immutable snapshots; after
/// creation only the two state fields and the gateway references change,
/// and only through [`Order::apply`] under a store's atomic update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// The owner who placed the order.
    pub owner_id: OwnerId,

    /// Snapshot of what was ordered, at the prices of the time.
    pub line_items: Vec<LineItem>,

    /// Server-computed sum of all line totals.
    pub total_amount: Money,

    /// Where the order ships, frozen at creation.
    pub shipping_address: AddressSnapshot,

    /// How the order is paid.
    pub payment_method: PaymentMethod,

    /// Payment outcome, orthogonal to fulfilment.
    pub payment_state: PaymentState,

    /// Fulfilment state.
    pub order_state: OrderState,

    /// Remote session id once a gateway session has been opened.
    pub gateway_session_id: Option<String>,

    /// Gateway's payment reference once captured.
    pub gateway_payment_ref: Option<String>,

    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order from line-item snapshots.
    ///
    /// The total is always computed here from the snapshots; client-supplied
    /// totals are never read. Cash-on-delivery orders are confirmed
    /// immediately since there is no payment outcome to await; gateway
    /// orders start pending.
    pub fn create(
        owner_id: OwnerId,
        line_items: Vec<LineItem>,
        shipping_address: AddressSnapshot,
        payment_method: PaymentMethod,
    ) -> Result<Self, OrderError> {
        if line_items.is_empty() {
            return Err(OrderError::NoItems);
        }

        for item in &line_items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id,
                    quantity: item.quantity,
                });
            }
            if !item.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    product_id: item.product_id,
                    paise: item.unit_price.paise(),
                });
            }
        }

        let total_amount = line_items.iter().map(LineItem::line_total).sum();

        let order_state = match payment_method {
            PaymentMethod::CashOnDelivery => OrderState::Confirmed,
            PaymentMethod::Gateway => OrderState::Pending,
        };

        Ok(Self {
            id: OrderId::new(),
            owner_id,
            line_items,
            total_amount,
            shipping_address,
            payment_method,
            payment_state: PaymentState::Pending,
            order_state,
            gateway_session_id: None,
            gateway_payment_ref: None,
            created_at: Utc::now(),
        })
    }

    /// Applies a transition after its guard has been checked.
    ///
    /// Stores call this inside their atomic update; everything else should
    /// go through a store so the compare-and-set guard is honored.
    pub fn apply(&mut self, transition: &OrderTransition) {
        match transition {
            OrderTransition::PaymentCaptured { payment_ref } => {
                self.payment_state = PaymentState::Completed;
                self.order_state = OrderState::Processing;
                self.gateway_payment_ref = Some(payment_ref.clone());
            }
            OrderTransition::PaymentFailed => {
                self.payment_state = PaymentState::Failed;
            }
            OrderTransition::Cancel => {
                self.order_state = OrderState::Cancelled;
            }
        }
    }

    /// Checks a transition's guard against this order, returning the
    /// matching error if it cannot be applied.
    pub fn check(&self, transition: &OrderTransition) -> Result<(), OrderError> {
        if transition.guard(self.payment_state, self.order_state) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                action: transition.action(),
                order_state: self.order_state,
                payment_state: self.payment_state,
            })
        }
    }
}
