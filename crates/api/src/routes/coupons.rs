//! Coupon endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::CouponId;
use document_store::DocumentStore;
use domain::{Coupon, NewCoupon};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::routes::parse_id;
use crate::routes::products::MessageResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

/// POST /coupons: admin only.
#[tracing::instrument(skip(state, identity, req))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    ValidJson(req): ValidJson<NewCoupon>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    let coupon = state.coupons.create(&identity, req).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// GET /coupons: admin only.
#[tracing::instrument(skip(state, identity))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Coupon>>, ApiError> {
    Ok(Json(state.coupons.list(&identity).await?))
}

/// DELETE /coupons/{id}: admin only.
#[tracing::instrument(skip(state, identity))]
pub async fn delete<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let coupon_id = parse_id("coupon id", &id, CouponId::parse)?;
    state.coupons.delete(&identity, coupon_id).await?;
    Ok(Json(MessageResponse {
        message: "Coupon removed",
    }))
}

/// POST /coupons/apply: returns the coupon if it can be used now.
#[tracing::instrument(skip(state, _identity))]
pub async fn apply<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(_identity): AuthUser,
    ValidJson(req): ValidJson<ApplyCouponRequest>,
) -> Result<Json<Coupon>, ApiError> {
    Ok(Json(state.coupons.apply(&req.code).await?))
}
