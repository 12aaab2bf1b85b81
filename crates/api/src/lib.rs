//! HTTP API server for the storefront.
//!
//! Provides REST endpoints for the catalog, carts, checkout, coupons, orders,
//! notifications, wishlists and reports, with bearer-token authentication,
//! structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use checkout::{CheckoutConfig, InMemoryPaymentGateway, PaymentGateway};
use document_store::DocumentStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::{StaticTokenVerifier, TokenVerifier};
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::scrape))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Catalog
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route("/products/{id}/reviews", post(routes::products::review::<S>))
        // Cart and checkout
        .route("/cart", get(routes::cart::view::<S>))
        .route("/cart/add", post(routes::cart::add::<S>))
        .route("/cart/update", put(routes::cart::update::<S>))
        .route("/cart/remove", delete(routes::cart::remove::<S>))
        .route("/checkout", post(routes::checkout::create::<S>))
        // Coupons
        .route(
            "/coupons",
            get(routes::coupons::list::<S>).post(routes::coupons::create::<S>),
        )
        .route("/coupons/apply", post(routes::coupons::apply::<S>))
        .route("/coupons/{id}", delete(routes::coupons::delete::<S>))
        // Orders
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/mine", get(routes::orders::mine::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", put(routes::orders::update_status::<S>))
        // Notifications and wishlist
        .route("/notifications", get(routes::notifications::list::<S>))
        .route(
            "/notifications/{id}/read",
            put(routes::notifications::mark_read::<S>),
        )
        .route("/wishlist", get(routes::wishlist::get::<S>))
        .route("/wishlist/add", post(routes::wishlist::add::<S>))
        .route("/wishlist/remove", delete(routes::wishlist::remove::<S>))
        // Reports
        .route(
            "/reports/total-revenue",
            get(routes::reports::total_revenue::<S>),
        )
        .route("/reports/order-count", get(routes::reports::order_count::<S>))
        .route(
            "/reports/top-selling-products",
            get(routes::reports::top_selling_products::<S>),
        )
        .route("/reconciliations", get(routes::reconciliations::list::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state with the in-memory payment gateway.
pub fn create_default_state<S: DocumentStore + Clone + 'static>(
    store: S,
    tokens: StaticTokenVerifier,
) -> Arc<AppState<S>> {
    create_state(
        store,
        Arc::new(InMemoryPaymentGateway::new()),
        Arc::new(tokens),
        CheckoutConfig::default(),
        "usd",
    )
}

/// Creates application state from explicit collaborators.
pub fn create_state<S: DocumentStore + Clone + 'static>(
    store: S,
    gateway: Arc<dyn PaymentGateway>,
    tokens: Arc<dyn TokenVerifier>,
    checkout_config: CheckoutConfig,
    default_currency: &str,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(
        store,
        gateway,
        tokens,
        checkout_config,
        default_currency,
    ))
}
