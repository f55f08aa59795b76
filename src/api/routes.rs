use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness))
        .route("/metrics", get(handlers::metrics))
        // Insights
        .route(
            "/v1/insights",
            get(handlers::get_insights).post(handlers::request_insights),
        )
        // Alerts
        .route(
            "/v1/alerts",
            get(handlers::list_alerts).post(handlers::create_alert),
        )
        .route("/v1/alerts/uncategorized", get(handlers::list_uncategorized))
        .route("/v1/alerts/categorize-all", post(handlers::categorize_all))
        .route(
            "/v1/alerts/create-and-categorize",
            post(handlers::create_and_categorize),
        )
        .route("/v1/alerts/:id", get(handlers::get_alert))
        .route("/v1/alerts/:id/categorize", post(handlers::categorize_alert))
        .route("/v1/alerts/:id/resolve", post(handlers::resolve_alert))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
