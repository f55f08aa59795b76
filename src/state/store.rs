use crate::error::{AppError, Result};
use crate::models::HealthAlert;
use crate::state::{AlertFilter, AlertStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory alert store
#[derive(Clone)]
pub struct InMemoryAlertStore {
    alerts: Arc<DashMap<u64, HealthAlert>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self {
            alerts: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    fn sorted(&self, keep: impl Fn(&HealthAlert) -> bool) -> Vec<HealthAlert> {
        let mut alerts: Vec<HealthAlert> = self
            .alerts
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        alerts.sort_by_key(|alert| alert.id);
        alerts
    }
}

impl Default for InMemoryAlertStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn create_alert(&self, mut alert: HealthAlert) -> Result<HealthAlert> {
        alert.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.alerts.insert(alert.id, alert.clone());

        tracing::debug!(alert_id = alert.id, "Alert saved");
        Ok(alert)
    }

    async fn get_alert(&self, id: u64) -> Result<Option<HealthAlert>> {
        Ok(self.alerts.get(&id).map(|entry| entry.clone()))
    }

    async fn update_alert(&self, alert: &HealthAlert) -> Result<()> {
        match self.alerts.get_mut(&alert.id) {
            Some(mut entry) => {
                *entry = alert.clone();
                tracing::debug!(alert_id = alert.id, "Alert updated");
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Alert {} not found", alert.id))),
        }
    }

    async fn list_alerts(&self, filter: &AlertFilter, skip: usize, limit: usize) -> Result<Vec<HealthAlert>> {
        Ok(self
            .sorted(|alert| filter.matches(alert))
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn list_uncategorized(&self) -> Result<Vec<HealthAlert>> {
        Ok(self.sorted(|alert| !alert.is_categorized()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertCategory, CategorizationResult, PriorityLevel};

    fn alert(title: &str) -> HealthAlert {
        HealthAlert::new(title.to_string(), "Description".to_string(), "Salesforce".to_string())
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = InMemoryAlertStore::new();
        let first = store.create_alert(alert("first")).await.unwrap();
        let second = store.create_alert(alert("second")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.get_alert(2).await.unwrap().unwrap().title, "second");
        assert!(store.get_alert(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_alert() {
        let store = InMemoryAlertStore::new();
        let mut missing = alert("ghost");
        missing.id = 42;

        let result = store.update_alert(&missing).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_uncategorized() {
        let store = InMemoryAlertStore::new();
        let mut categorized = store.create_alert(alert("done")).await.unwrap();
        store.create_alert(alert("pending")).await.unwrap();

        categorized.apply_categorization(&CategorizationResult {
            category: AlertCategory::Security,
            priority: PriorityLevel::High,
            summary: "s".to_string(),
            recommendation: "r".to_string(),
            is_fallback: false,
            fallback_reason: None,
        });
        store.update_alert(&categorized).await.unwrap();

        let pending = store.list_uncategorized().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "pending");
    }

    #[tokio::test]
    async fn test_list_with_filter_and_pagination() {
        let store = InMemoryAlertStore::new();
        for i in 0..5 {
            let mut a = alert(&format!("alert-{}", i));
            a.is_resolved = i % 2 == 0;
            store.create_alert(a.with_category("limits")).await.unwrap();
        }

        let filter = AlertFilter {
            unresolved_only: true,
            category: Some("limits".to_string()),
        };
        let page = store.list_alerts(&filter, 0, 10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, "alert-1");

        let all = store.list_alerts(&AlertFilter::default(), 1, 2).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, 2);
    }
}
