//! Reconciliation queue endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use checkout::Reconciliation;
use document_store::DocumentStore;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /reconciliations: captured payments awaiting manual action. Admin only.
#[tracing::instrument(skip(state, identity))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Reconciliation>>, ApiError> {
    Ok(Json(state.reconciliations.list(&identity).await?))
}
