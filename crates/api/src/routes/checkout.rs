//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use checkout::CheckoutRequest;
use document_store::DocumentStore;
use domain::Order;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub payment_method_token: String,
    pub currency: Option<String>,
    pub coupon_code: Option<String>,
}

/// POST /checkout: pay for the caller's cart and create the order.
#[tracing::instrument(skip(state, identity, body), fields(user_id = %identity.user_id))]
pub async fn create<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    ValidJson(body): ValidJson<CheckoutBody>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let request = CheckoutRequest {
        payment_method_token: body.payment_method_token,
        currency: body
            .currency
            .unwrap_or_else(|| state.default_currency.clone()),
        coupon_code: body.coupon_code,
    };

    let order = state.checkout.checkout(&identity, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}
