pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::ai::InsightsOrchestrator;
use crate::service::HealthAlertService;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub alerts: Arc<HealthAlertService>,
    pub insights: Arc<InsightsOrchestrator>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(alerts: Arc<HealthAlertService>, insights: Arc<InsightsOrchestrator>) -> Self {
        Self {
            alerts,
            insights,
            started_at: Instant::now(),
        }
    }
}
