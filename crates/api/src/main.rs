//! API server entry point.

use std::sync::Arc;

use api::auth::StaticTokenVerifier;
use api::config::{Config, LogFormat};
use checkout::{CheckoutConfig, HttpPaymentGateway, InMemoryPaymentGateway, PaymentGateway};
use document_store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn payment_gateway(config: &Config) -> Arc<dyn PaymentGateway> {
    match (&config.payment_gateway_url, &config.payment_gateway_secret) {
        (Some(url), Some(secret)) => {
            tracing::info!(%url, "using HTTP payment gateway");
            Arc::new(HttpPaymentGateway::new(url.clone(), secret.clone()))
        }
        _ => {
            tracing::warn!("no payment gateway configured, using in-memory gateway");
            Arc::new(InMemoryPaymentGateway::new())
        }
    }
}

async fn serve<S: DocumentStore + Clone + 'static>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
) {
    let tokens: StaticTokenVerifier = config.api_tokens.iter().cloned().collect();
    if tokens.is_empty() {
        tracing::warn!("API_TOKENS is empty, every authenticated route will answer 401");
    }

    let checkout_config = CheckoutConfig {
        payment_timeout: config.payment_timeout,
        commit_attempts: config.checkout_commit_retries,
        discount_floor: config.coupon_discount_floor,
        hold_ttl: config.checkout_hold_ttl,
    };
    let state = api::create_state(
        store,
        payment_gateway(config),
        Arc::new(tokens),
        checkout_config,
        &config.default_currency,
    );
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env().expect("invalid configuration");
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the document store and serve
    match &config.database_url {
        Some(url) => {
            let store = PostgresDocumentStore::connect(url, 10)
                .await
                .expect("failed to connect to PostgreSQL");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL document store");
            serve(store, &config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, documents are kept in memory");
            serve(InMemoryDocumentStore::new(), &config, metrics_handle).await;
        }
    }
}
