//! DocuChat API Gateway
//!
//! The HTTP entry point for article uploads and questions.
//! Handles:
//! - Request routing
//! - Concurrency and body size limits
//! - Observability (logging, metrics)
//! - Graceful shutdown and store disconnect

mod handlers;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use docuchat_common::{
    config::{AppConfig, ObservabilityConfig},
    metrics,
    services::AppServices,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: AppServices,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    init_tracing(&config.observability)?;

    info!(
        service = %config.observability.service_name,
        "Starting DocuChat API Gateway v{}",
        docuchat_common::VERSION
    );

    // Initialize metrics
    init_metrics(&config.observability)?;
    metrics::register_metrics();

    // Wire services; the store connects on first use
    let services = AppServices::from_config(&config);
    let store = services.store.clone();

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        services,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host or server.port")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.disconnect().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json_logging {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
            .context("Failed to init logging")?;
    } else {
        registry
            .with(fmt::layer().with_target(true))
            .try_init()
            .context("Failed to init logging")?;
    }

    Ok(())
}

/// Serve Prometheus metrics on their own port. Port 0 disables the exporter.
fn init_metrics(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("ingestion_duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("model_duration_seconds".to_string()),
            metrics::MODEL_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Metrics exporter listening on {}", addr);
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

    let server = &state.config.server;
    let concurrency = ConcurrencyLimitLayer::new(server.max_concurrent_requests.max(1));
    let body_limit = DefaultBodyLimit::max(server.max_upload_bytes);

    // Ingestion and answering, bounded
    let api_routes = Router::new()
        .route("/upload", post(handlers::upload::upload))
        .route("/chat", post(handlers::chat::chat))
        .layer(body_limit)
        .layer(concurrency);

    Router::new()
        // Health endpoints stay outside the concurrency limit
        .route("/", get(handlers::health::health))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
