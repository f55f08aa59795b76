//! Alert lifecycle on top of the store and the categorizer.

use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::ai::AlertCategorizer;
use crate::error::{AppError, Result};
use crate::models::{AlertInput, CategorizationResult, HealthAlert, NewHealthAlert};
use crate::state::{AlertFilter, AlertStore};

/// An alert together with the categorization just computed for it
#[derive(Debug, Clone, Serialize)]
pub struct CategorizedAlert {
    pub alert: HealthAlert,
    pub categorization: CategorizationResult,
}

/// Health alert service
#[derive(Clone)]
pub struct HealthAlertService {
    store: Arc<dyn AlertStore>,
    categorizer: AlertCategorizer,
}

impl HealthAlertService {
    pub fn new(store: Arc<dyn AlertStore>, categorizer: AlertCategorizer) -> Self {
        Self { store, categorizer }
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    pub async fn create_alert(&self, new_alert: NewHealthAlert) -> Result<HealthAlert> {
        new_alert.validate()?;
        let alert = self.store.create_alert(new_alert.into()).await?;
        tracing::info!(
            alert_id = alert.id,
            source_system = %alert.source_system,
            "Health alert created"
        );
        Ok(alert)
    }

    pub async fn get_alert(&self, id: u64) -> Result<HealthAlert> {
        self.store
            .get_alert(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", id)))
    }

    pub async fn list_alerts(&self, filter: &AlertFilter, skip: usize, limit: usize) -> Result<Vec<HealthAlert>> {
        self.store.list_alerts(filter, skip, limit).await
    }

    pub async fn list_uncategorized(&self) -> Result<Vec<HealthAlert>> {
        self.store.list_uncategorized().await
    }

    /// Categorize one alert. A fallback result is returned to the caller but
    /// not written, so the alert stays eligible for a later pass.
    pub async fn categorize(&self, id: u64) -> Result<CategorizedAlert> {
        let alert = self.get_alert(id).await?;
        self.categorize_loaded(alert).await
    }

    /// Categorize every alert without an AI category. Returns how many were
    /// written.
    pub async fn categorize_all_uncategorized(&self) -> Result<usize> {
        let pending = self.store.list_uncategorized().await?;
        let total = pending.len();
        let mut written = 0;

        for alert in pending {
            let alert_id = alert.id;
            match self.categorize_loaded(alert).await {
                Ok(result) if !result.categorization.is_fallback => written += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!(alert_id, error = %e, "Failed to store categorization"),
            }
        }

        tracing::info!(total, written, "Categorization pass finished");
        Ok(written)
    }

    pub async fn create_and_categorize(&self, new_alert: NewHealthAlert) -> Result<CategorizedAlert> {
        let alert = self.create_alert(new_alert).await?;
        self.categorize_loaded(alert).await
    }

    pub async fn mark_resolved(&self, id: u64, resolved: bool) -> Result<HealthAlert> {
        let mut alert = self.get_alert(id).await?;
        alert.is_resolved = resolved;
        alert.updated_at = Some(chrono::Utc::now());
        self.store.update_alert(&alert).await?;

        tracing::info!(alert_id = id, resolved, "Alert resolution updated");
        Ok(alert)
    }

    async fn categorize_loaded(&self, mut alert: HealthAlert) -> Result<CategorizedAlert> {
        let categorization = self
            .categorizer
            .categorize_alert(&AlertInput::from(&alert))
            .await;

        if !categorization.is_fallback {
            alert.apply_categorization(&categorization);
            self.store.update_alert(&alert).await?;
        }

        Ok(CategorizedAlert {
            alert,
            categorization,
        })
    }
}
