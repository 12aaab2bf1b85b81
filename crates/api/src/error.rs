//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use document_store::DocumentStoreError;
use domain::DomainError;
use reporting::ReportError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or unknown bearer token.
    Unauthorized(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Checkout error.
    Checkout(CheckoutError),
    /// Report error.
    Report(ReportError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Report(err) => report_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        metrics::counter!("api_errors_total", "status" => status.as_u16().to_string())
            .increment(1);
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "message": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::AlreadyExists { .. }
        | DomainError::InvalidInput(_)
        | DomainError::InsufficientStock { .. }
        | DomainError::InvalidCoupon(_)
        | DomainError::InvalidStatusTransition { .. } => StatusCode::BAD_REQUEST,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::CheckoutInProgress(_) | DomainError::Contention { .. } => StatusCode::CONFLICT,
        DomainError::DocumentStore(e) => return store_error_to_response(e),
        DomainError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    let status = match err {
        CheckoutError::Domain(inner) => return domain_error_to_response(inner),
        CheckoutError::DocumentStore(ref e) => return store_error_to_response(e),
        CheckoutError::InvalidRequest(_)
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::InvalidCoupon(_) => StatusCode::BAD_REQUEST,
        CheckoutError::EmptyCart | CheckoutError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::CheckoutInProgress(_) => StatusCode::CONFLICT,
        CheckoutError::PaymentFailed(_)
        | CheckoutError::HoldLost(_)
        | CheckoutError::PostPaymentCommitFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn report_error_to_response(err: ReportError) -> (StatusCode, String) {
    match err {
        ReportError::InvalidRange(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        ReportError::Domain(inner) => domain_error_to_response(inner),
    }
}

fn store_error_to_response(err: &DocumentStoreError) -> (StatusCode, String) {
    if err.is_conflict() {
        (StatusCode::CONFLICT, err.to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::Report(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ProductId, ReconciliationId, UserId};

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_domain_status_mapping() {
        assert_eq!(
            status_of(DomainError::not_found("Product", "x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::Forbidden("no".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_checkout_status_mapping() {
        assert_eq!(status_of(CheckoutError::EmptyCart), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(CheckoutError::InsufficientStock {
                product_id: ProductId::new(),
                requested: 2,
                available: 1,
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::PaymentFailed("declined".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CheckoutError::PostPaymentCommitFailure {
                reconciliation_id: ReconciliationId::new(),
                payment_reference: "PAY-0001".into(),
                reason: "conflict".into(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CheckoutError::Domain(DomainError::Forbidden("no".into()))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(CheckoutError::CheckoutInProgress(UserId::new())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::CheckoutInProgress(UserId::new())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_unauthorized_and_report_mapping() {
        assert_eq!(
            status_of(ApiError::Unauthorized("missing token".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ReportError::InvalidRange("reversed".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_body_carries_message() {
        let response = ApiError::BadRequest("quantity must be at least 1".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "quantity must be at least 1");
    }
}
