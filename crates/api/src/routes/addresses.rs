//! Address book endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::AddressId;
use domain::{Address, AddressKind, NewAddress};
use serde::Serialize;
use store::Store;
use uuid::Uuid;

use crate::auth::Owner;
use crate::error::ApiError;
use crate::AppState;

#[derive(Serialize)]
pub struct AddressResponse {
    pub id: AddressId,
    pub kind: AddressKind,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Address> for AddressResponse {
    fn from(address: Address) -> Self {
        Self {
            id: address.id,
            kind: address.kind,
            street: address.street,
            city: address.city,
            region: address.region,
            postal_code: address.postal_code,
            is_default: address.is_default,
            created_at: address.created_at,
        }
    }
}

/// GET /addresses — the owner's address book, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
) -> Result<Json<Vec<AddressResponse>>, ApiError> {
    let addresses = state.store.list_addresses(owner).await?;
    Ok(Json(addresses.into_iter().map(Into::into).collect()))
}

/// POST /addresses — adds an address.
///
/// The owner's first address becomes the default regardless of the request;
/// a later address with `is_default` set displaces the previous default.
#[tracing::instrument(skip(state, fields))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Json(fields): Json<NewAddress>,
) -> Result<(StatusCode, Json<AddressResponse>), ApiError> {
    let address = Address::new(owner, fields)?;
    let stored = state.store.insert_address(address).await?;
    Ok((StatusCode::CREATED, Json(stored.into())))
}

/// DELETE /addresses/{id} — removes an address.
///
/// Deleting the default promotes the most recently created remaining
/// address.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete_address(owner, AddressId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /addresses/{id}/default — makes the address the owner's default.
#[tracing::instrument(skip(state))]
pub async fn set_default<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Result<Json<AddressResponse>, ApiError> {
    let updated = state
        .store
        .set_default_address(owner, AddressId::from_uuid(id))
        .await?;
    Ok(Json(updated.into()))
}
