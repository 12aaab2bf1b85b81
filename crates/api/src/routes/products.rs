//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ProductId;
use document_store::DocumentStore;
use domain::{NewProduct, Product, ProductSearch, ProductUpdate};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// GET /products: every product, or those matching `name` and/or `category`.
#[tracing::instrument(skip(state))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(search): Query<ProductSearch>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = if search.name.is_none() && search.category.is_none() {
        state.catalog.list().await?
    } else {
        state.catalog.search(search).await?
    };
    Ok(Json(products))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id = parse_id("product id", &id, ProductId::parse)?;
    Ok(Json(state.catalog.get(product_id).await?))
}

/// POST /products: list a product sold by the caller.
#[tracing::instrument(skip(state, identity, req))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    ValidJson(req): ValidJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create(&identity, req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id}: seller or admin only.
#[tracing::instrument(skip(state, identity, req))]
pub async fn update<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<ProductUpdate>,
) -> Result<Json<Product>, ApiError> {
    let product_id = parse_id("product id", &id, ProductId::parse)?;
    Ok(Json(state.catalog.update(&identity, product_id, req).await?))
}

/// DELETE /products/{id}: seller or admin only.
#[tracing::instrument(skip(state, identity))]
pub async fn delete<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let product_id = parse_id("product id", &id, ProductId::parse)?;
    state.catalog.delete(&identity, product_id).await?;
    Ok(Json(MessageResponse {
        message: "Product removed",
    }))
}

/// POST /products/{id}/reviews
#[tracing::instrument(skip(state, identity, req))]
pub async fn review<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<ReviewRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product_id = parse_id("product id", &id, ProductId::parse)?;
    let product = state
        .catalog
        .add_review(&identity, product_id, req.rating, req.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}
