use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use validator::Validate;

use crate::ai::FailureKind;

/// Canonical AI category for a health alert
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertCategory {
    Performance,
    Security,
    Data,
    Integration,
    Compliance,
    Configuration,
    Code,
    UserExperience,
    Uncategorized,
}

impl AlertCategory {
    /// Human-readable name, as offered to the model in the prompt
    pub fn display_name(&self) -> &'static str {
        match self {
            AlertCategory::Performance => "Performance",
            AlertCategory::Security => "Security",
            AlertCategory::Data => "Data",
            AlertCategory::Integration => "Integration",
            AlertCategory::Compliance => "Compliance",
            AlertCategory::Configuration => "Configuration",
            AlertCategory::Code => "Code",
            AlertCategory::UserExperience => "User Experience",
            AlertCategory::Uncategorized => "Uncategorized",
        }
    }

    /// Known synonyms, including the source-system health categories
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            AlertCategory::Performance => &[
                "perf",
                "latency",
                "slow",
                "response time",
                "optimizer",
                "stability",
                "scalability",
            ],
            AlertCategory::Security => &[
                "access control",
                "permissions",
                "permission",
                "auth",
                "authentication",
                "vulnerability",
            ],
            AlertCategory::Data => &[
                "data integrity",
                "storage",
                "limits",
                "data quality",
                "database",
            ],
            AlertCategory::Integration => &[
                "api",
                "external system",
                "data flow",
                "event",
                "events",
                "connector",
            ],
            AlertCategory::Compliance => &["regulatory", "policy", "governance", "audit"],
            AlertCategory::Configuration => &[
                "config",
                "settings",
                "setup",
                "org settings",
                "misconfiguration",
            ],
            AlertCategory::Code => &["apex", "trigger", "custom code", "exceptions", "exception", "bug"],
            AlertCategory::UserExperience => &["ux", "ui", "interface", "portal", "usability"],
            AlertCategory::Uncategorized => &["unknown", "other", "none", "n/a"],
        }
    }
}

/// Priority assigned by categorization
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl PriorityLevel {
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            PriorityLevel::Low => &["p3", "p4", "minor", "trivial", "info", "informational", "sev4"],
            PriorityLevel::Medium => &["p2", "moderate", "normal", "med", "sev3"],
            PriorityLevel::High => &["p1", "major", "important", "severe", "sev2"],
            PriorityLevel::Critical => &["p0", "urgent", "blocker", "emergency", "sev1", "sev0"],
        }
    }
}

/// A Salesforce health alert as stored by the persistence collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthAlert {
    /// Store-assigned identifier (0 until saved)
    pub id: u64,

    pub title: String,

    pub description: String,

    /// Category reported by the source system, if any
    pub category: Option<String>,

    /// System that raised the alert
    pub source_system: String,

    /// Opaque payload from the source system
    pub raw_data: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,

    // AI-derived fields
    pub ai_category: Option<AlertCategory>,
    pub ai_priority: Option<PriorityLevel>,
    pub ai_summary: Option<String>,
    pub ai_recommendation: Option<String>,

    pub is_resolved: bool,

    /// JIRA ticket opened for this alert
    pub jira_ticket_id: Option<String>,

    pub slack_alert_sent: bool,
}

impl HealthAlert {
    /// Create an unsaved alert
    pub fn new(title: String, description: String, source_system: String) -> Self {
        Self {
            id: 0,
            title,
            description,
            category: None,
            source_system,
            raw_data: None,
            created_at: Utc::now(),
            updated_at: None,
            ai_category: None,
            ai_priority: None,
            ai_summary: None,
            ai_recommendation: None,
            is_resolved: false,
            jira_ticket_id: None,
            slack_alert_sent: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_raw_data(mut self, raw_data: serde_json::Value) -> Self {
        self.raw_data = Some(raw_data);
        self
    }

    /// An alert counts as categorized once the AI category is written
    pub fn is_categorized(&self) -> bool {
        self.ai_category.is_some()
    }

    /// Write the AI-derived fields, overwriting any previous categorization
    pub fn apply_categorization(&mut self, result: &CategorizationResult) {
        self.ai_category = Some(result.category);
        self.ai_priority = Some(result.priority);
        self.ai_summary = Some(result.summary.clone());
        self.ai_recommendation = Some(result.recommendation.clone());
        self.updated_at = Some(Utc::now());
    }
}

/// Request body for creating an alert
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewHealthAlert {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(min = 1))]
    pub description: String,

    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub source_system: String,

    #[serde(default)]
    pub raw_data: Option<serde_json::Value>,
}

impl From<NewHealthAlert> for HealthAlert {
    fn from(new: NewHealthAlert) -> Self {
        let mut alert = HealthAlert::new(new.title, new.description, new.source_system);
        alert.category = new.category;
        alert.raw_data = new.raw_data;
        alert
    }
}

/// The textual content of one alert handed to the categorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub raw_data: Option<serde_json::Value>,
    #[serde(default)]
    pub source_system: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl AlertInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            raw_data: None,
            source_system: None,
            category: None,
        }
    }
}

impl From<&HealthAlert> for AlertInput {
    fn from(alert: &HealthAlert) -> Self {
        Self {
            title: alert.title.clone(),
            description: alert.description.clone(),
            raw_data: alert.raw_data.clone(),
            source_system: Some(alert.source_system.clone()),
            category: alert.category.clone(),
        }
    }
}

/// Outcome of categorizing one alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationResult {
    pub category: AlertCategory,
    pub priority: PriorityLevel,
    pub summary: String,
    pub recommendation: String,
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FailureKind>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_category_identifiers() {
        assert_eq!(AlertCategory::UserExperience.to_string(), "user_experience");
        assert_eq!(
            AlertCategory::from_str("uncategorized").unwrap(),
            AlertCategory::Uncategorized
        );
        assert_eq!(
            serde_json::to_string(&AlertCategory::Security).unwrap(),
            "\"security\""
        );
    }

    #[test]
    fn test_priority_default_is_medium() {
        assert_eq!(PriorityLevel::default(), PriorityLevel::Medium);
        assert_eq!(PriorityLevel::Critical.as_ref(), "critical");
    }

    #[test]
    fn test_apply_categorization() {
        let mut alert = HealthAlert::new(
            "Apex CPU limit".to_string(),
            "Trigger exceeded CPU time".to_string(),
            "salesforce".to_string(),
        );
        assert!(!alert.is_categorized());

        alert.apply_categorization(&CategorizationResult {
            category: AlertCategory::Code,
            priority: PriorityLevel::High,
            summary: "CPU limit hit".to_string(),
            recommendation: "Move logic to a queueable".to_string(),
            is_fallback: false,
            fallback_reason: None,
        });

        assert!(alert.is_categorized());
        assert_eq!(alert.ai_priority, Some(PriorityLevel::High));
        assert!(alert.updated_at.is_some());
    }

    #[test]
    fn test_new_alert_validation() {
        let request = NewHealthAlert {
            title: String::new(),
            description: "d".to_string(),
            category: None,
            source_system: "salesforce".to_string(),
            raw_data: None,
        };
        assert!(request.validate().is_err());
    }
}
