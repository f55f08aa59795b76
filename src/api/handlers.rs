use crate::api::AppState;
use crate::error::Result;
use crate::models::{HealthAlert, InsightResult, NewHealthAlert, TimeRange};
use crate::service::CategorizedAlert;
use crate::state::AlertFilter;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Readiness: whether the insights preflight would pass
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    match state.insights.readiness() {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                issue: None,
            }),
        ),
        Err(issue) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                issue: Some(issue.to_string()),
            }),
        ),
    }
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
}

/// Insights for the window named in the query string
pub async fn get_insights(
    State(state): State<AppState>,
    Query(params): Query<InsightsRequest>,
) -> Json<InsightResult> {
    Json(state.insights.get_insights(params.time_range()).await)
}

/// Insights for the window named in the request body
pub async fn request_insights(
    State(state): State<AppState>,
    Json(request): Json<InsightsRequest>,
) -> Json<InsightResult> {
    Json(state.insights.get_insights(request.time_range()).await)
}

#[derive(Debug, Default, Deserialize)]
pub struct InsightsRequest {
    pub time_range: Option<String>,
}

impl InsightsRequest {
    fn time_range(&self) -> TimeRange {
        self.time_range
            .as_deref()
            .map(TimeRange::parse_lenient)
            .unwrap_or_default()
    }
}

/// Create an alert
pub async fn create_alert(
    State(state): State<AppState>,
    Json(request): Json<NewHealthAlert>,
) -> Result<(StatusCode, Json<HealthAlert>)> {
    let alert = state.alerts.create_alert(request).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

/// List alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<ListAlertsQuery>,
) -> Result<Json<Vec<HealthAlert>>> {
    let filter = AlertFilter {
        unresolved_only: params.unresolved_only.unwrap_or(false),
        category: params.category,
    };
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);

    Ok(Json(state.alerts.list_alerts(&filter, skip, limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub unresolved_only: Option<bool>,
    pub category: Option<String>,
}

/// Alerts without an AI category
pub async fn list_uncategorized(State(state): State<AppState>) -> Result<Json<Vec<HealthAlert>>> {
    Ok(Json(state.alerts.list_uncategorized().await?))
}

/// Get an alert by ID
pub async fn get_alert(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<HealthAlert>> {
    Ok(Json(state.alerts.get_alert(id).await?))
}

/// Categorize (or recategorize) one alert
pub async fn categorize_alert(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<CategorizedAlert>> {
    Ok(Json(state.alerts.categorize(id).await?))
}

/// Categorize every uncategorized alert
pub async fn categorize_all(State(state): State<AppState>) -> Result<Json<CategorizeAllResponse>> {
    let categorized = state.alerts.categorize_all_uncategorized().await?;
    Ok(Json(CategorizeAllResponse {
        categorized,
        message: format!("Categorized {} alerts successfully", categorized),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategorizeAllResponse {
    pub categorized: usize,
    pub message: String,
}

/// Create an alert and categorize it in one call
pub async fn create_and_categorize(
    State(state): State<AppState>,
    Json(request): Json<NewHealthAlert>,
) -> Result<(StatusCode, Json<CategorizedAlert>)> {
    let result = state.alerts.create_and_categorize(request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Mark an alert resolved (`?resolved=false` reopens it)
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<HealthAlert>> {
    let resolved = params.resolved.unwrap_or(true);
    Ok(Json(state.alerts.mark_resolved(id, resolved).await?))
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub resolved: Option<bool>,
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    let metrics = crate::metrics::gather_metrics();
    (StatusCode::OK, metrics)
}
