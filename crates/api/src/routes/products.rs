//! Catalog endpoints. Unauthenticated: the catalog is public.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::ProductId;
use domain::{Category, Product};
use serde::Deserialize;
use store::{ProductFilter, Store};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// How many related products to return.
const RELATED_LIMIT: usize = 4;

#[derive(Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// GET /products — lists the catalog, optionally filtered by `?category=`
/// and `?search=`.
#[tracing::instrument(skip(state, params))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let mut filter = ProductFilter::new();
    if let Some(ref name) = params.category {
        let category = Category::parse(name)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown category {name:?}")))?;
        filter = filter.category(category);
    }
    if let Some(term) = params.search {
        filter = filter.search(term);
    }

    let products = state.store.list_products(&filter).await?;
    Ok(Json(products))
}

/// GET /products/{id} — a single product.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .store
        .get_product(ProductId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".to_string()))?;
    Ok(Json(product))
}

/// GET /products/related/{id} — other products from the same category.
#[tracing::instrument(skip(state))]
pub async fn related<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let related = state
        .store
        .related_products(ProductId::from_uuid(id), RELATED_LIMIT)
        .await
        .map_err(|err| match err {
            store::StoreError::NotFound => ApiError::NotFound("product not found".to_string()),
            other => other.into(),
        })?;
    Ok(Json(related))
}
