//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::ProductId;
use document_store::DocumentStore;
use domain::{Cart, CartView};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveLineRequest {
    pub product_id: String,
}

/// POST /cart/add: add units of a product, creating the cart if needed.
#[tracing::instrument(skip(state, identity))]
pub async fn add<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    ValidJson(req): ValidJson<CartLineRequest>,
) -> Result<Json<Cart>, ApiError> {
    let product_id = parse_id("product_id", &req.product_id, ProductId::parse)?;
    let cart = state.carts.add(&identity, product_id, req.quantity).await?;
    Ok(Json(cart))
}

/// PUT /cart/update: set the quantity of an existing line.
#[tracing::instrument(skip(state, identity))]
pub async fn update<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    ValidJson(req): ValidJson<CartLineRequest>,
) -> Result<Json<Cart>, ApiError> {
    let product_id = parse_id("product_id", &req.product_id, ProductId::parse)?;
    let cart = state
        .carts
        .update(&identity, product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /cart/remove: drop a line from the cart.
#[tracing::instrument(skip(state, identity))]
pub async fn remove<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    ValidJson(req): ValidJson<RemoveLineRequest>,
) -> Result<Json<Cart>, ApiError> {
    let product_id = parse_id("product_id", &req.product_id, ProductId::parse)?;
    let cart = state.carts.remove(&identity, product_id).await?;
    Ok(Json(cart))
}

/// GET /cart: the caller's cart priced at current catalog prices.
#[tracing::instrument(skip(state, identity))]
pub async fn view<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.view(&identity).await?))
}
