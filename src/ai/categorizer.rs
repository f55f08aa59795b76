use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::completion::{parse_structured, ChatCompletion};
use super::error::{AiError, AiResult};
use super::fallback;
use super::normalizer::CategoryNormalizer;
use super::preflight;
use super::transport::{ChatRequest, InferenceTransport, Message};
use crate::config::InferenceConfig;
use crate::metrics;
use crate::models::{AlertInput, CategorizationResult};

const OPERATION: &str = "categorization";

const SYSTEM_PROMPT: &str = r#"You are a Salesforce Health Analyzer specialized in categorizing health alerts.

Analyze the health alert and provide:
1. A category - choose the most appropriate one based on the alert details
2. A priority level (low, medium, high, or critical) based on the potential impact
3. A concise summary of the issue
4. A recommended action to resolve the issue

Categories to choose from:
- Performance: Issues related to system performance, response times, etc.
- Security: Security vulnerabilities, permission issues, access control problems
- Data: Issues with data integrity, storage, limits, etc.
- Integration: Problems with external systems, APIs, data flows
- Compliance: Regulatory or policy violations
- Configuration: System setup issues, organization settings
- Code: Problems in custom code, Apex triggers, etc.
- User Experience: Interface issues affecting users

Ensure your recommendations are specific, actionable, and appropriate for the severity.

Respond with a single JSON object and nothing else, matching this schema:
{
  "category": "one of the categories above",
  "priority": "low | medium | high | critical",
  "summary": "concise summary of the issue",
  "recommendation": "specific recommended action"
}"#;

/// Categorization as written by the model, before normalization
#[derive(Debug, Clone, Deserialize)]
struct RawCategorization {
    category: String,
    priority: String,
    summary: String,
    recommendation: String,
}

/// Per-alert request/response cycle against the chat completion endpoint.
///
/// Never fails: every error becomes an uncategorized, medium-priority
/// fallback result. Writing the result back to the alert is the caller's job.
#[derive(Clone)]
pub struct AlertCategorizer {
    transport: Arc<dyn InferenceTransport>,
    config: Arc<InferenceConfig>,
    normalizer: CategoryNormalizer,
}

impl AlertCategorizer {
    pub fn new(transport: Arc<dyn InferenceTransport>, config: Arc<InferenceConfig>) -> Self {
        let normalizer = CategoryNormalizer::new(config.similarity_threshold);
        Self {
            transport,
            config,
            normalizer,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.categorization_timeout_secs)
    }

    /// Categorize one alert
    pub async fn categorize_alert(&self, alert: &AlertInput) -> CategorizationResult {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        match self.try_categorize(alert).await {
            Ok(result) => {
                metrics::record_orchestration(OPERATION, None, started.elapsed());
                info!(
                    request_id = %request_id,
                    title = %alert.title,
                    category = %result.category,
                    priority = %result.priority,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Alert categorized"
                );
                result
            }
            Err(err) => {
                let kind = err.classification();
                metrics::record_orchestration(OPERATION, Some(kind), started.elapsed());
                if kind.is_persistent() {
                    error!(
                        request_id = %request_id,
                        title = %alert.title,
                        classification = %kind,
                        error = %err,
                        "Alert categorization unavailable, returning fallback"
                    );
                } else {
                    warn!(
                        request_id = %request_id,
                        title = %alert.title,
                        classification = %kind,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %err,
                        "Alert categorization failed, returning fallback"
                    );
                }
                fallback::categorization(Some(kind))
            }
        }
    }

    async fn try_categorize(&self, alert: &AlertInput) -> AiResult<CategorizationResult> {
        let api_key = preflight::check_credentials(&self.config)?;
        let request = build_request(&self.config.model_id, alert);

        let timeout = self.timeout();
        let body = tokio::time::timeout(timeout, self.transport.complete(&api_key, &request))
            .await
            .map_err(|_| AiError::Timeout(timeout.as_secs()))??;
        debug!(bytes = body.len(), "Categorization response received");

        let raw = parse_response(&body)?;
        Ok(self.normalize(raw))
    }

    fn normalize(&self, raw: RawCategorization) -> CategorizationResult {
        CategorizationResult {
            category: self.normalizer.normalize_category(&raw.category),
            priority: self.normalizer.normalize_priority(&raw.priority),
            summary: raw.summary.trim().to_string(),
            recommendation: raw.recommendation.trim().to_string(),
            is_fallback: false,
            fallback_reason: None,
        }
    }
}

fn build_request(model_id: &str, alert: &AlertInput) -> ChatRequest {
    let raw_data = match &alert.raw_data {
        Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        None => "None provided".to_string(),
    };

    let user_prompt = format!(
        "Health Alert Details:\n\nTitle: {}\nDescription: {}\nSource System: {}\nCategory: {}\nRaw Data: {}",
        alert.title,
        alert.description,
        alert.source_system.as_deref().unwrap_or("unknown"),
        alert.category.as_deref().unwrap_or("none"),
        raw_data,
    );

    ChatRequest {
        model: model_id.to_string(),
        messages: vec![Message::system(SYSTEM_PROMPT), Message::user(user_prompt)],
        response_format: Some(serde_json::json!({"type": "json_object"})),
    }
}

fn parse_response(body: &str) -> AiResult<RawCategorization> {
    let completion: ChatCompletion = serde_json::from_str(body)
        .map_err(|e| AiError::Malformed(format!("response body is not a chat completion: {}", e)))?;

    let raw: RawCategorization = match completion.any_content() {
        Some(content) => parse_structured(content)?,
        None if completion.choices().next().is_none() => parse_structured(body)?,
        None => return Err(AiError::Malformed("completion has no content".to_string())),
    };

    let blank: Vec<&str> = [
        ("summary", &raw.summary),
        ("recommendation", &raw.recommendation),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();
    if !blank.is_empty() {
        return Err(AiError::Schema(format!("blank fields: {}", blank.join(", "))));
    }

    Ok(raw)
}
