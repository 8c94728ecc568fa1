//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{AddressError, OrderError};
use gateway::GatewayError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid credential.
    Unauthorized,
    /// Resource not found, or not owned by the caller. The two cases return
    /// the same response so record existence never leaks across owners.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The request conflicts with current state.
    Conflict(String),
    /// Store error.
    Store(StoreError),
    /// Payment flow error.
    Gateway(GatewayError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "authentication required".to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Gateway(err) => gateway_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        _ => {
            tracing::error!(error = %err, "store error");
            // Internal details stay out of the response.
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

fn gateway_error_to_response(err: GatewayError) -> (StatusCode, String) {
    match err {
        GatewayError::Unavailable(_) => {
            tracing::warn!(error = %err, "payment gateway unavailable");
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
        GatewayError::InvalidSignature | GatewayError::MalformedPayload(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        GatewayError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "order not found".to_string()),
        GatewayError::WrongPaymentMethod(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        GatewayError::AlreadySettled(_) | GatewayError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        GatewayError::Store(inner) => store_error_to_response(inner),
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Gateway(err)
    }
}

impl From<AddressError> for ApiError {
    fn from(err: AddressError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match &err {
            OrderError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}
