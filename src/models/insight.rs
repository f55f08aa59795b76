use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::ai::FailureKind;

/// Analysis window for insights
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeRange {
    Day,
    #[default]
    Week,
    Month,
}

impl TimeRange {
    pub const ALL: [TimeRange; 3] = [TimeRange::Day, TimeRange::Week, TimeRange::Month];

    /// Parse a user-supplied value; anything unrecognized means a week.
    pub fn parse_lenient(value: &str) -> Self {
        value.trim().to_lowercase().parse().unwrap_or_default()
    }

    /// Window phrase used in the analysis prompt
    pub fn window(&self) -> &'static str {
        match self {
            TimeRange::Day => "24 hours",
            TimeRange::Week => "7 days",
            TimeRange::Month => "30 days",
        }
    }
}

/// One titled finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightEntry {
    pub title: String,
    pub description: String,
}

impl InsightEntry {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }
}

/// The four content fields the agent must return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightContent {
    pub alert_pattern: InsightEntry,
    pub potential_issue: InsightEntry,
    pub suggested_action: InsightEntry,
    pub system_health_summary: String,
}

impl InsightContent {
    /// Names of the fields that are present but blank
    pub fn blank_fields(&self) -> Vec<&'static str> {
        let mut blank = Vec::new();
        if !self.alert_pattern.is_complete() {
            blank.push("alert_pattern");
        }
        if !self.potential_issue.is_complete() {
            blank.push("potential_issue");
        }
        if !self.suggested_action.is_complete() {
            blank.push("suggested_action");
        }
        if self.system_health_summary.trim().is_empty() {
            blank.push("system_health_summary");
        }
        blank
    }
}

/// Aggregate insights for a time range. Always fully populated, real or
/// placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResult {
    pub alert_pattern: InsightEntry,
    pub potential_issue: InsightEntry,
    pub suggested_action: InsightEntry,
    pub system_health_summary: String,
    pub generated_at: DateTime<Utc>,
    pub time_range: TimeRange,
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FailureKind>,
}

impl InsightResult {
    pub fn from_content(
        content: InsightContent,
        time_range: TimeRange,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            alert_pattern: content.alert_pattern,
            potential_issue: content.potential_issue,
            suggested_action: content.suggested_action,
            system_health_summary: content.system_health_summary,
            generated_at,
            time_range,
            is_fallback: false,
            fallback_reason: None,
        }
    }

    /// True when every textual field is non-empty
    pub fn is_well_formed(&self) -> bool {
        self.alert_pattern.is_complete()
            && self.potential_issue.is_complete()
            && self.suggested_action.is_complete()
            && !self.system_health_summary.trim().is_empty()
    }
}
