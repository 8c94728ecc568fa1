//! Order endpoints: checkout, history, gateway sessions, webhooks.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, ProductId};
use domain::{
    AddressSnapshot, LineItem, Order, OrderTransition, PaymentMethod, UnitKind,
};
use serde::{Deserialize, Serialize};
use store::Store;
use uuid::Uuid;

use crate::auth::Owner;
use crate::error::ApiError;
use crate::AppState;

/// Header carrying the webhook signature.
const SIGNATURE_HEADER: &str = "X-Signature";

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// What the client-held cart contains. Prices are looked up server-side;
    /// a client cannot supply a total.
    pub items: Vec<OrderItemRequest>,

    /// Which of the owner's addresses to ship to.
    pub address_id: AddressId,

    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub items: Vec<OrderItemResponse>,
    pub total_paise: i64,
    pub shipping_address: AddressSnapshot,
    pub payment_method: PaymentMethod,
    pub payment_state: String,
    pub order_state: String,
    pub gateway_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price_paise: i64,
    pub unit_kind: UnitKind,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            items: order
                .line_items
                .into_iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id,
                    name: item.name,
                    quantity: item.quantity,
                    unit_price_paise: item.unit_price.paise(),
                    unit_kind: item.unit_kind,
                })
                .collect(),
            total_paise: order.total_amount.paise(),
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            payment_state: order.payment_state.to_string(),
            order_state: order.order_state.to_string(),
            gateway_session_id: order.gateway_session_id,
            created_at: order.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct LatestOrderResponse {
    pub order: Option<LatestOrder>,
}

#[derive(Serialize)]
pub struct LatestOrder {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CreatePaymentResponse {
    pub order_id: OrderId,
    /// The gateway's id for the remote session; the client hands this to the
    /// hosted checkout page.
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

// -- Handlers --

/// POST /orders — creates an order from the client-held cart.
///
/// Unit prices are snapshotted from the catalog here; the computed total is
/// the only total that exists. Cash-on-delivery orders come back confirmed,
/// gateway orders pending.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let address = state
        .store
        .get_address(owner, req.address_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("address not found".to_string()))?;

    let mut line_items = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let product = state
            .store
            .get_product(item.product_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("product not found".to_string()))?;

        line_items.push(LineItem::new(
            product.id,
            product.name,
            item.quantity,
            product.pricing.unit_price(),
            product.pricing.unit_kind(),
        ));
    }

    let order = Order::create(
        owner,
        line_items,
        AddressSnapshot::from(&address),
        req.payment_method,
    )?;
    state.store.insert_order(&order).await?;

    metrics::counter!("orders_created_total").increment(1);
    tracing::info!(order_id = %order.id, method = %order.payment_method, "order created");

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — the owner's order history, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.store.list_orders(owner).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/latest — id and timestamp of the owner's most recent order.
#[tracing::instrument(skip(state))]
pub async fn latest<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
) -> Result<Json<LatestOrderResponse>, ApiError> {
    let order = state.store.latest_order(owner).await?;
    Ok(Json(LatestOrderResponse {
        order: order.map(|o| LatestOrder {
            id: o.id,
            created_at: o.created_at,
        }),
    }))
}

/// GET /orders/{id} — a single order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .store
        .get_order(owner, OrderId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("order not found".to_string()))?;
    Ok(Json(order.into()))
}

/// POST /orders/create-payment — opens (or re-uses) the gateway session for
/// a pending gateway order.
///
/// Retrying after a gateway failure hits the same order again; no duplicate
/// order or session is ever created.
#[tracing::instrument(skip(state, req))]
pub async fn create_payment<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Json<CreatePaymentResponse>, ApiError> {
    let session = state.flow.open_session(owner, req.order_id).await?;

    Ok(Json(CreatePaymentResponse {
        order_id: req.order_id,
        gateway_order_id: session.session_id,
        amount: session.amount.paise(),
        currency: session.currency,
    }))
}

/// POST /orders/webhook — signed gateway callback.
///
/// Unauthenticated: trust comes from the HMAC signature over the exact raw
/// bytes received, which is why the handler takes `Bytes` rather than a
/// deserialized body.
#[tracing::instrument(skip_all)]
pub async fn webhook<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing signature header".to_string()))?;

    state.flow.handle_webhook(&body, signature).await?;
    Ok(Json(WebhookResponse { received: true }))
}

/// POST /orders/{id}/cancel — cancels an order that has not started
/// processing.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = OrderId::from_uuid(id);
    let not_found = || ApiError::NotFound("order not found".to_string());

    // Ownership check first; the unscoped transition below is keyed by an id
    // only the owner could have learned here.
    state
        .store
        .get_order(owner, id)
        .await?
        .ok_or_else(not_found)?;

    match state
        .store
        .apply_transition(id, &OrderTransition::Cancel)
        .await?
    {
        Some(updated) => Ok(Json(updated.into())),
        None => {
            let current = state
                .store
                .get_order(owner, id)
                .await?
                .ok_or_else(not_found)?;
            match current.check(&OrderTransition::Cancel) {
                Err(err) => Err(err.into()),
                Ok(()) => Err(ApiError::Conflict(
                    "cancellation lost a concurrent update".to_string(),
                )),
            }
        }
    }
}
