//! Wishlist endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::ProductId;
use document_store::DocumentStore;
use domain::{Wishlist, WishlistView};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    pub product_id: String,
}

/// POST /wishlist/add
#[tracing::instrument(skip(state, identity))]
pub async fn add<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    ValidJson(req): ValidJson<WishlistRequest>,
) -> Result<Json<Wishlist>, ApiError> {
    let product_id = parse_id("product_id", &req.product_id, ProductId::parse)?;
    Ok(Json(state.wishlists.add(&identity, product_id).await?))
}

/// GET /wishlist: the caller's wishlist with products resolved.
#[tracing::instrument(skip(state, identity))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<WishlistView>, ApiError> {
    Ok(Json(state.wishlists.get(&identity).await?))
}

/// DELETE /wishlist/remove
#[tracing::instrument(skip(state, identity))]
pub async fn remove<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    ValidJson(req): ValidJson<WishlistRequest>,
) -> Result<Json<Wishlist>, ApiError> {
    let product_id = parse_id("product_id", &req.product_id, ProductId::parse)?;
    Ok(Json(state.wishlists.remove(&identity, product_id).await?))
}
