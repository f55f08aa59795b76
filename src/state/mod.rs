pub mod store;

pub use store::*;

use crate::error::Result;
use crate::models::HealthAlert;
use async_trait::async_trait;

/// Trait for health alert storage operations
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Persist a new alert, assigning its id
    async fn create_alert(&self, alert: HealthAlert) -> Result<HealthAlert>;

    /// Get an alert by ID
    async fn get_alert(&self, id: u64) -> Result<Option<HealthAlert>>;

    /// Replace a stored alert
    async fn update_alert(&self, alert: &HealthAlert) -> Result<()>;

    /// List alerts in id order
    async fn list_alerts(&self, filter: &AlertFilter, skip: usize, limit: usize) -> Result<Vec<HealthAlert>>;

    /// Alerts without an AI category
    async fn list_uncategorized(&self) -> Result<Vec<HealthAlert>>;
}

/// Filter for querying alerts
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub unresolved_only: bool,
    pub category: Option<String>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &HealthAlert) -> bool {
        let resolved_match = !self.unresolved_only || !alert.is_resolved;
        let category_match = self
            .category
            .as_deref()
            .map_or(true, |c| alert.category.as_deref() == Some(c));
        resolved_match && category_match
    }
}
