//! HTTP API server for the grocery storefront.
//!
//! Provides the REST surface for addresses, orders, the payment flow,
//! products and favorites, with structured logging (tracing) and Prometheus
//! metrics. Handlers are generic over the [`Store`] implementation so the
//! same router runs against PostgreSQL in production and the in-memory
//! store in tests.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use gateway::{CheckoutFlow, PaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub store: Arc<S>,
    pub flow: CheckoutFlow<S>,
}

/// Builds the shared state from a store and a payment gateway.
pub fn create_state<S: Store>(
    store: S,
    payment_gateway: Arc<dyn PaymentGateway>,
    webhook_secret: &str,
) -> Arc<AppState<S>> {
    let store = Arc::new(store);
    let flow = CheckoutFlow::new(store.clone(), payment_gateway, webhook_secret);
    Arc::new(AppState { store, flow })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/addresses",
            get(routes::addresses::list::<S>).post(routes::addresses::create::<S>),
        )
        .route("/addresses/{id}", delete(routes::addresses::remove::<S>))
        .route(
            "/addresses/{id}/default",
            put(routes::addresses::set_default::<S>),
        )
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route("/orders/latest", get(routes::orders::latest::<S>))
        .route(
            "/orders/create-payment",
            post(routes::orders::create_payment::<S>),
        )
        .route("/orders/webhook", post(routes::orders::webhook::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/related/{id}", get(routes::products::related::<S>))
        .route(
            "/favorites",
            get(routes::favorites::list::<S>)
                .post(routes::favorites::add::<S>)
                .delete(routes::favorites::remove::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
