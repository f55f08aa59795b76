use sf_health_analyzer::{
    ai::{preflight, AlertCategorizer, HttpInferenceClient, InferenceTransport, InsightsOrchestrator},
    api::{build_router, AppState},
    config::Config,
    service::HealthAlertService,
    state::InMemoryAlertStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    let level = config.observability.log_level.clone();
    let json_logs = config.observability.json_logs;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("sf_health_analyzer={level},tower_http={level}").into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting SF Health Analyzer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        base_url = %config.inference.base_url,
        model = %config.inference.model_id,
        "Inference service configured"
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = sf_health_analyzer::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Misconfiguration does not stop the server; requests fall back until fixed.
    match preflight::check_agent_target(&config.inference) {
        Ok(target) => tracing::info!(
            app_name = %target.app_name,
            db_attachment = %target.db_attachment,
            "Insights preflight passed"
        ),
        Err(issue) => tracing::error!(
            classification = "configuration_error",
            issue = %issue,
            "Insights preflight failed; insights will return fallback results"
        ),
    }

    // Initialize components
    let inference = Arc::new(config.inference.clone());
    let transport: Arc<dyn InferenceTransport> =
        Arc::new(HttpInferenceClient::new(inference.base_url.clone())?);
    let categorizer = AlertCategorizer::new(transport.clone(), inference.clone());
    let insights = Arc::new(InsightsOrchestrator::new(transport, inference));
    let store = Arc::new(InMemoryAlertStore::new());
    let alerts = Arc::new(HealthAlertService::new(store, categorizer));

    let app = build_router(AppState::new(alerts, insights));

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    tracing::info!("Starting HTTP server on {}", http_addr);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("Press Ctrl+C to shutdown");
    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
