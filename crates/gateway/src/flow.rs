//! Checkout flow: the orchestration between the order ledger and the
//! payment gateway.

use std::sync::Arc;
use std::time::Instant;

use common::{OrderId, OwnerId};
use domain::{OrderTransition, PaymentMethod};
use serde::Deserialize;
use store::OrderStore;

use crate::client::{CURRENCY, GatewaySession, PaymentGateway};
use crate::error::{GatewayError, Result};
use crate::signature::verify_signature;

/// A webhook delivery from the gateway.
///
/// The envelope mirrors the gateway's wire format: the payment entity
/// references the remote session (`order_id` in gateway terms) and the
/// gateway's own payment id.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub payment: WebhookPayment,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayment {
    pub entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    /// The gateway's session id, matched against `gateway_session_id`.
    pub order_id: String,

    /// The gateway's payment reference.
    pub id: String,
}

/// Orchestrates session creation and webhook application against the ledger.
pub struct CheckoutFlow<S> {
    store: Arc<S>,
    gateway: Arc<dyn PaymentGateway>,
    webhook_secret: String,
}

impl<S: OrderStore> CheckoutFlow<S> {
    /// Creates a new checkout flow.
    pub fn new(
        store: Arc<S>,
        gateway: Arc<dyn PaymentGateway>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Opens a remote payment session for one of the owner's orders.
    ///
    /// Retry-safe: if the order already carries a session id, it is returned
    /// without a second remote call, so a client retry never duplicates the
    /// order or the session. A gateway failure surfaces as `Unavailable` and
    /// leaves the order pending.
    #[tracing::instrument(skip(self))]
    pub async fn open_session(&self, owner: OwnerId, order_id: OrderId) -> Result<GatewaySession> {
        let order = self
            .store
            .get_order(owner, order_id)
            .await?
            .ok_or(GatewayError::OrderNotFound(order_id))?;

        if order.payment_method != PaymentMethod::Gateway {
            return Err(GatewayError::WrongPaymentMethod(order_id));
        }
        if order.payment_state.is_settled() {
            return Err(GatewayError::AlreadySettled(order_id));
        }
        if let Some(session_id) = order.gateway_session_id {
            return Ok(GatewaySession {
                session_id,
                amount: order.total_amount,
                currency: CURRENCY.to_string(),
            });
        }

        let started = Instant::now();
        let session = self.gateway.create_session(order.id, order.total_amount).await?;
        metrics::histogram!("gateway_session_seconds").record(started.elapsed().as_secs_f64());

        if self
            .store
            .claim_gateway_session(order.id, &session.session_id)
            .await?
        {
            metrics::counter!("gateway_sessions_opened").increment(1);
            tracing::info!(%order_id, session_id = %session.session_id, "opened gateway session");
            return Ok(session);
        }

        // Lost the claim to a concurrent checkout call; reuse the winner's
        // session instead of the one just created.
        let existing = self
            .store
            .get_order(owner, order_id)
            .await?
            .and_then(|o| o.gateway_session_id);
        match existing {
            Some(session_id) => Ok(GatewaySession {
                session_id,
                amount: order.total_amount,
                currency: CURRENCY.to_string(),
            }),
            None => Ok(session),
        }
    }

    /// Verifies a webhook delivery and applies its transition exactly once.
    ///
    /// The signature is recomputed over the raw bytes received; mismatches
    /// are dropped with `InvalidSignature` and change no state. A redelivery
    /// of an already-applied event is acknowledged as a no-op; an event that
    /// conflicts with the recorded outcome is rejected with
    /// `InvalidTransition`.
    #[tracing::instrument(skip_all)]
    pub async fn handle_webhook(&self, body: &[u8], signature: &str) -> Result<()> {
        if !verify_signature(self.webhook_secret.as_bytes(), body, signature) {
            metrics::counter!("webhook_rejected_total").increment(1);
            tracing::warn!("dropping webhook with invalid signature");
            return Err(GatewayError::InvalidSignature);
        }

        let event: WebhookEvent = serde_json::from_slice(body)?;

        let transition = match event.event.as_str() {
            "payment.captured" => OrderTransition::PaymentCaptured {
                payment_ref: event.payload.payment.entity.id.clone(),
            },
            "payment.failed" => OrderTransition::PaymentFailed,
            other => {
                tracing::debug!(event = other, "ignoring webhook event type");
                return Ok(());
            }
        };

        let session_id = &event.payload.payment.entity.order_id;
        let Some(order) = self.store.find_by_gateway_session(session_id).await? else {
            tracing::warn!(%session_id, "webhook references no known gateway session, dropping");
            return Ok(());
        };

        match self.store.apply_transition(order.id, &transition).await? {
            Some(updated) => {
                let outcome = match transition {
                    OrderTransition::PaymentCaptured { .. } => "captured",
                    _ => "failed",
                };
                metrics::counter!("webhook_payments_total", "outcome" => outcome).increment(1);
                tracing::info!(
                    order_id = %updated.id,
                    payment_state = %updated.payment_state,
                    order_state = %updated.order_state,
                    "applied webhook transition"
                );
                Ok(())
            }
            None => {
                // Lost the compare-and-set. Distinguish a redelivery from a
                // genuinely conflicting outcome.
                let Some(current) = self.store.find_by_gateway_session(session_id).await? else {
                    return Ok(());
                };
                if transition.already_applied(current.payment_state, current.order_state) {
                    tracing::debug!(order_id = %current.id, "duplicate webhook delivery, no-op");
                    Ok(())
                } else {
                    Err(GatewayError::InvalidTransition {
                        order_id: current.id,
                        payment_state: current.payment_state,
                        order_state: current.order_state,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockPaymentGateway;
    use crate::signature::sign;
    use common::ProductId;
    use domain::{
        AddressSnapshot, LineItem, Money, Order, OrderState, PaymentState, UnitKind,
    };
    use store::{InMemoryStore, OrderStore};

    const SECRET: &str = "whsec_test_secret";

    fn order(owner: OwnerId, method: PaymentMethod) -> Order {
        let items = vec![LineItem::new(
            ProductId::new(),
            "Basmati Rice",
            2,
            Money::from_paise(12000),
            UnitKind::Weight,
        )];
        let shipping = AddressSnapshot {
            street: "12 Market Road".into(),
            city: "Pune".into(),
            region: "Maharashtra".into(),
            postal_code: "411001".into(),
        };
        Order::create(owner, items, shipping, method).unwrap()
    }

    async fn setup() -> (CheckoutFlow<InMemoryStore>, Arc<InMemoryStore>, MockPaymentGateway) {
        let store = Arc::new(InMemoryStore::new());
        let gateway = MockPaymentGateway::new();
        let flow = CheckoutFlow::new(store.clone(), Arc::new(gateway.clone()), SECRET);
        (flow, store, gateway)
    }

    fn captured_event(session_id: &str, payment_ref: &str) -> Vec<u8> {
        serde_json::json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "order_id": session_id,
                "id": payment_ref,
            }}}
        })
        .to_string()
        .into_bytes()
    }

    fn failed_event(session_id: &str) -> Vec<u8> {
        serde_json::json!({
            "event": "payment.failed",
            "payload": { "payment": { "entity": {
                "order_id": session_id,
                "id": "pay_failed",
            }}}
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn open_session_stores_and_reuses_session_id() {
        let (flow, store, gateway) = setup().await;
        let owner = OwnerId::new();
        let order = order(owner, PaymentMethod::Gateway);
        store.insert_order(&order).await.unwrap();

        let first = flow.open_session(owner, order.id).await.unwrap();
        assert_eq!(first.amount, order.total_amount);

        let stored = store.get_order(owner, order.id).await.unwrap().unwrap();
        assert_eq!(stored.gateway_session_id.as_deref(), Some(first.session_id.as_str()));

        // Retry re-uses the session without a second remote call.
        let second = flow.open_session(owner, order.id).await.unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(gateway.session_count(), 1);
    }

    #[tokio::test]
    async fn open_session_rejects_cod_orders() {
        let (flow, store, _) = setup().await;
        let owner = OwnerId::new();
        let order = order(owner, PaymentMethod::CashOnDelivery);
        store.insert_order(&order).await.unwrap();

        let result = flow.open_session(owner, order.id).await;
        assert!(matches!(result, Err(GatewayError::WrongPaymentMethod(_))));
    }

    #[tokio::test]
    async fn open_session_unavailable_leaves_order_pending() {
        let (flow, store, gateway) = setup().await;
        let owner = OwnerId::new();
        let order = order(owner, PaymentMethod::Gateway);
        store.insert_order(&order).await.unwrap();

        gateway.set_fail(true);
        let result = flow.open_session(owner, order.id).await;
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));

        let stored = store.get_order(owner, order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_state, PaymentState::Pending);
        assert!(stored.gateway_session_id.is_none());

        // The same order is retried once the gateway is back.
        gateway.set_fail(false);
        let session = flow.open_session(owner, order.id).await.unwrap();
        assert!(gateway.has_session(&session.session_id));
    }

    #[tokio::test]
    async fn open_session_for_foreign_owner_is_not_found() {
        let (flow, store, _) = setup().await;
        let owner = OwnerId::new();
        let order = order(owner, PaymentMethod::Gateway);
        store.insert_order(&order).await.unwrap();

        let result = flow.open_session(OwnerId::new(), order.id).await;
        assert!(matches!(result, Err(GatewayError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn captured_webhook_transitions_once_and_is_idempotent() {
        let (flow, store, _) = setup().await;
        let owner = OwnerId::new();
        let order = order(owner, PaymentMethod::Gateway);
        store.insert_order(&order).await.unwrap();

        let session = flow.open_session(owner, order.id).await.unwrap();
        let body = captured_event(&session.session_id, "pay_42");
        let signature = sign(SECRET.as_bytes(), &body);

        flow.handle_webhook(&body, &signature).await.unwrap();

        let stored = store.get_order(owner, order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_state, PaymentState::Completed);
        assert_eq!(stored.order_state, OrderState::Processing);
        assert_eq!(stored.gateway_payment_ref.as_deref(), Some("pay_42"));

        // The gateway redelivers; the handler short-circuits successfully.
        flow.handle_webhook(&body, &signature).await.unwrap();

        let after_redelivery = store.get_order(owner, order.id).await.unwrap().unwrap();
        assert_eq!(after_redelivery, stored);
    }

    #[tokio::test]
    async fn tampered_or_unsigned_webhook_changes_nothing() {
        let (flow, store, _) = setup().await;
        let owner = OwnerId::new();
        let order = order(owner, PaymentMethod::Gateway);
        store.insert_order(&order).await.unwrap();
        let session = flow.open_session(owner, order.id).await.unwrap();

        let body = captured_event(&session.session_id, "pay_42");
        let signature = sign(SECRET.as_bytes(), &body);

        // Tampered body with the old signature.
        let tampered = captured_event(&session.session_id, "pay_evil");
        let result = flow.handle_webhook(&tampered, &signature).await;
        assert!(matches!(result, Err(GatewayError::InvalidSignature)));

        // Signature from the wrong secret.
        let wrong = sign(b"not_the_secret", &body);
        let result = flow.handle_webhook(&body, &wrong).await;
        assert!(matches!(result, Err(GatewayError::InvalidSignature)));

        let stored = store.get_order(owner, order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_state, PaymentState::Pending);
        assert_eq!(stored.order_state, OrderState::Pending);
    }

    #[tokio::test]
    async fn failed_webhook_marks_payment_failed_only() {
        let (flow, store, _) = setup().await;
        let owner = OwnerId::new();
        let order = order(owner, PaymentMethod::Gateway);
        store.insert_order(&order).await.unwrap();
        let session = flow.open_session(owner, order.id).await.unwrap();

        let body = failed_event(&session.session_id);
        let signature = sign(SECRET.as_bytes(), &body);
        flow.handle_webhook(&body, &signature).await.unwrap();

        let stored = store.get_order(owner, order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_state, PaymentState::Failed);
        assert_eq!(stored.order_state, OrderState::Pending);

        // Redelivery of the failure is a no-op.
        flow.handle_webhook(&body, &signature).await.unwrap();

        // A capture arriving after the failure conflicts.
        let capture = captured_event(&session.session_id, "pay_late");
        let capture_sig = sign(SECRET.as_bytes(), &capture);
        let result = flow.handle_webhook(&capture, &capture_sig).await;
        assert!(matches!(result, Err(GatewayError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn unknown_session_and_unknown_event_are_acknowledged() {
        let (flow, _, _) = setup().await;

        let body = captured_event("sess_unknown", "pay_1");
        let signature = sign(SECRET.as_bytes(), &body);
        flow.handle_webhook(&body, &signature).await.unwrap();

        let body = serde_json::json!({
            "event": "payment.authorized",
            "payload": { "payment": { "entity": {
                "order_id": "sess_whatever",
                "id": "pay_1",
            }}}
        })
        .to_string()
        .into_bytes();
        let signature = sign(SECRET.as_bytes(), &body);
        flow.handle_webhook(&body, &signature).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_signed_payload_is_rejected() {
        let (flow, _, _) = setup().await;

        let body = br#"{"event": 42}"#;
        let signature = sign(SECRET.as_bytes(), body);
        let result = flow.handle_webhook(body, &signature).await;
        assert!(matches!(result, Err(GatewayError::MalformedPayload(_))));
    }
}
