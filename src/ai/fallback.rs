//! Deterministic placeholder results. Pure functions: no I/O, no failure.

use chrono::{DateTime, Utc};

use super::error::FailureKind;
use crate::models::{
    AlertCategory, CategorizationResult, InsightEntry, InsightResult, PriorityLevel, TimeRange,
};

/// Placeholder insights for `time_range`, stamped with `generated_at`.
pub fn insights(
    time_range: TimeRange,
    reason: Option<FailureKind>,
    generated_at: DateTime<Utc>,
) -> InsightResult {
    let (alert_pattern, potential_issue, suggested_action, summary) = match reason {
        Some(FailureKind::ConfigurationError) => (
            InsightEntry::new(
                "Database configuration error",
                "The AI insights service is temporarily unavailable.",
            ),
            InsightEntry::new(
                "Missing follower database",
                "The database attachment is not configured as a follower (read-only replica), which the agent service requires.",
            ),
            InsightEntry::new(
                "Create a follower database",
                "Attach a follower of the primary database and point the inference configuration at its attachment name.",
            ),
            "AI insights unavailable - database configuration error".to_string(),
        ),
        Some(FailureKind::Timeout) => (
            InsightEntry::new(
                "Analysis timed out",
                format!(
                    "Alert analysis for the last {} did not finish in time.",
                    time_range.window()
                ),
            ),
            InsightEntry::new(
                "Insights temporarily unavailable",
                "The AI insights service took too long to respond.",
            ),
            InsightEntry::new(
                "Try again shortly",
                "Refresh the insights panel in a few minutes; review recent alerts manually in the meantime.",
            ),
            "AI insights unavailable - analysis timed out".to_string(),
        ),
        _ => (
            InsightEntry::new(
                "Insights unavailable",
                format!(
                    "Alert patterns for the last {} could not be analyzed.",
                    time_range.window()
                ),
            ),
            InsightEntry::new(
                "AI service unavailable",
                "The AI insights service is temporarily unavailable.",
            ),
            InsightEntry::new(
                "Review alerts manually",
                "Check unresolved critical and high priority alerts directly until insights are available again.",
            ),
            "AI insights unavailable - showing placeholder data".to_string(),
        ),
    };

    InsightResult {
        alert_pattern,
        potential_issue,
        suggested_action,
        system_health_summary: summary,
        generated_at,
        time_range,
        is_fallback: true,
        fallback_reason: reason,
    }
}

/// Placeholder categorization: uncategorized, medium priority.
pub fn categorization(reason: Option<FailureKind>) -> CategorizationResult {
    let summary = match reason {
        Some(FailureKind::ConfigurationError) => {
            "Automated categorization is unavailable: the inference service is not configured."
        }
        Some(FailureKind::Timeout) => {
            "Automated categorization is unavailable: the inference service did not respond in time."
        }
        _ => "Automated categorization is unavailable for this alert.",
    };

    CategorizationResult {
        category: AlertCategory::Uncategorized,
        priority: PriorityLevel::Medium,
        summary: summary.to_string(),
        recommendation: "Review this alert manually and recategorize it once the AI service is available."
            .to_string(),
        is_fallback: true,
        fallback_reason: reason,
    }
}
