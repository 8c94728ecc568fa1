//! Owner identity extraction.
//!
//! Session and credential issuance are delegated to an external identity
//! provider; by the time a request reaches this API the bearer credential is
//! the opaque owner token that provider minted. Every authenticated handler
//! takes [`Owner`] and scopes its queries by it — handlers never read an
//! owner id out of the request body.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::OwnerId;

use crate::error::ApiError;

/// The authenticated owner, resolved from the `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct Owner(pub OwnerId);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let owner = token
            .trim()
            .parse::<OwnerId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Owner(owner))
    }
}
