//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use document_store::DocumentStore;
use domain::{Order, OrderStatus};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// GET /orders: every order, newest first. Admin only.
#[tracing::instrument(skip(state, identity))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_all(&identity).await?))
}

/// GET /orders/mine: the caller's orders, newest first.
#[tracing::instrument(skip(state, identity))]
pub async fn mine<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_mine(&identity).await?))
}

/// GET /orders/{id}: owner or admin.
#[tracing::instrument(skip(state, identity))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_id("order id", &id, OrderId::parse)?;
    Ok(Json(state.orders.get(&identity, order_id).await?))
}

/// PUT /orders/{id}/status: admin only.
#[tracing::instrument(skip(state, identity))]
pub async fn update_status<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<StatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_id("order id", &id, OrderId::parse)?;
    let order = state
        .orders
        .update_status(&identity, order_id, req.status)
        .await?;
    Ok(Json(order))
}
