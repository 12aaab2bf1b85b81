//! Sales report endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use document_store::DocumentStore;
use reporting::{DateRange, OrderCount, ProductSales, RevenueReport};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters shared by every report.
#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<String>,
}

impl ReportParams {
    fn range(&self) -> Result<DateRange, ApiError> {
        Ok(DateRange::parse(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        )?)
    }

    fn limit(&self) -> Result<Option<usize>, ApiError> {
        self.limit
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or_else(|| {
                        ApiError::BadRequest(format!("limit must be a positive integer, got {raw:?}"))
                    })
            })
            .transpose()
    }
}

/// GET /reports/total-revenue
#[tracing::instrument(skip(state, identity))]
pub async fn total_revenue<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Query(params): Query<ReportParams>,
) -> Result<Json<RevenueReport>, ApiError> {
    let range = params.range()?;
    Ok(Json(state.reports.total_revenue(&identity, range).await?))
}

/// GET /reports/order-count
#[tracing::instrument(skip(state, identity))]
pub async fn order_count<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Query(params): Query<ReportParams>,
) -> Result<Json<OrderCount>, ApiError> {
    let range = params.range()?;
    Ok(Json(state.reports.order_count(&identity, range).await?))
}

/// GET /reports/top-selling-products
#[tracing::instrument(skip(state, identity))]
pub async fn top_selling_products<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(identity): AuthUser,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<ProductSales>>, ApiError> {
    let range = params.range()?;
    let limit = params.limit()?;
    Ok(Json(
        state
            .reports
            .top_selling_products(&identity, range, limit)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_parsing() {
        let params = ReportParams {
            limit: Some("5".to_string()),
            ..ReportParams::default()
        };
        assert_eq!(params.limit().unwrap(), Some(5));

        assert_eq!(ReportParams::default().limit().unwrap(), None);

        for bad in ["0", "-1", "ten"] {
            let params = ReportParams {
                limit: Some(bad.to_string()),
                ..ReportParams::default()
            };
            assert!(params.limit().is_err());
        }
    }
}
