//! Favorites endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::ProductId;
use domain::{Favorite, UnitKind};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::auth::Owner;
use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize)]
pub struct FavoriteRequest {
    pub product_id: ProductId,
}

/// A favorite joined with its product, shaped for product cards.
#[derive(Serialize)]
pub struct FavoriteProductResponse {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub unit_price_paise: i64,
    pub unit_kind: UnitKind,
}

#[derive(Serialize)]
pub struct StatusMessage {
    pub message: &'static str,
}

/// GET /favorites — the owner's favorites, newest first, joined with the
/// catalog. Favorites whose product has since been removed are skipped.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
) -> Result<Json<Vec<FavoriteProductResponse>>, ApiError> {
    let favorites = state.store.list_favorites(owner).await?;

    let mut products = Vec::with_capacity(favorites.len());
    for favorite in favorites {
        if let Some(product) = state.store.get_product(favorite.product_id).await? {
            products.push(FavoriteProductResponse {
                product_id: product.id,
                name: product.name,
                image: product.image,
                unit_price_paise: product.pricing.unit_price().paise(),
                unit_kind: product.pricing.unit_kind(),
            });
        }
    }

    Ok(Json(products))
}

/// POST /favorites — saves a product.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Json(req): Json<FavoriteRequest>,
) -> Result<(StatusCode, Json<StatusMessage>), ApiError> {
    state
        .store
        .get_product(req.product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".to_string()))?;

    state
        .store
        .add_favorite(Favorite::new(owner, req.product_id))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StatusMessage {
            message: "added to favorites",
        }),
    ))
}

/// DELETE /favorites — removes a product from favorites. Removing a product
/// that is not saved is a no-op, matching the toggle semantics clients use.
#[tracing::instrument(skip(state, req))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Owner(owner): Owner,
    Json(req): Json<FavoriteRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    state.store.remove_favorite(owner, req.product_id).await?;
    Ok(Json(StatusMessage {
        message: "removed from favorites",
    }))
}
