//! Notification endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::NotificationId;
use document_store::DocumentStore;
use domain::Notification;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::AppState;

/// GET /notifications: the caller's notifications, newest first.
#[tracing::instrument(skip(state, identity))]
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.notifications.list(&identity).await?))
}

/// PUT /notifications/{id}/read: owner only.
#[tracing::instrument(skip(state, identity))]
pub async fn mark_read<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let notification_id = parse_id("notification id", &id, NotificationId::parse)?;
    Ok(Json(
        state
            .notifications
            .mark_read(&identity, notification_id)
            .await?,
    ))
}
