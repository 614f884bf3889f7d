//! GraphRAG API Gateway
//!
//! HTTP front for GraphRAG queries.
//! Handles:
//! - Global, local, DRIFT and basic search
//! - Engine-first dispatch with CLI fallback
//! - Status and health endpoints
//! - Observability (logging, metrics, tracing)

mod handlers;

use anyhow::Context;
use axum::{routing::get, Router};
use graphrag_common::{
    config::{AppConfig, ObservabilityConfig},
    metrics, SearchDispatcher,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<SearchDispatcher>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config.observability);

    info!("Starting GraphRAG API Gateway v{}", graphrag_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();
    install_metrics_exporter(&config.observability)?;

    // Resolve engine, load index artifacts, prepare CLI fallback
    let dispatcher = SearchDispatcher::initialize(&config)
        .await
        .context("failed to initialize search")?;

    info!(
        engine_available = dispatcher.engine_available(),
        data_loaded = dispatcher.data_loaded(),
        "Search initialized"
    );

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down GraphRAG API Gateway");
    Ok(())
}

/// Initialize tracing; RUST_LOG overrides the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Serve Prometheus metrics on a dedicated port when enabled
fn install_metrics_exporter(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::SEARCH_BUCKETS,
        )?
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;

    info!(service = %config.service_name, "Metrics exporter listening on {}", addr);
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        // Status endpoints
        .route("/", get(handlers::status::root))
        .route("/status", get(handlers::status::status))
        .route("/health", get(handlers::health::health))

        // Search endpoints
        .route("/search/global", get(handlers::search::global_search))
        .route("/search/local", get(handlers::search::local_search))
        .route("/search/drift", get(handlers::search::drift_search))
        .route("/search/basic", get(handlers::search::basic_search))

        // Backward-compatible query endpoint
        .route("/query", get(handlers::search::query))

        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
