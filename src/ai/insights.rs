//! Aggregate insights over an agentic, streaming endpoint.
//!
//! Per-request state machine:
//!
//! ```text
//! Idle -> PreconditionCheck -> Requesting -> Streaming -> Completed
//!                 |                 |            |
//!                 +-----------------+------------+--> Fallback(kind)
//! ```
//!
//! `Completed` and `Fallback` are terminal. Every request owns its session
//! (state, parser, tool-call budget); nothing is shared between requests.

use chrono::Utc;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::budget::{mentions_call_limit, ToolCallBudget, MAX_TOOL_CALLS, TOOL_LIMIT_ERROR_CODE};
use super::completion::{parse_structured, ChatCompletion};
use super::error::{AiError, AiResult, ConfigIssue, FailureKind, StreamError};
use super::fallback;
use super::preflight::{self, AgentTarget};
use super::stream::{EventStreamParser, StreamEvent, ERROR_EVENT, MESSAGE_EVENT};
use super::transport::{AgentRequest, AgentTool, InferenceTransport, Message};
use crate::config::InferenceConfig;
use crate::metrics;
use crate::models::{InsightContent, InsightResult, TimeRange};

const OPERATION: &str = "insights";

/// State of one insights request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightsState {
    Idle,
    PreconditionCheck,
    Requesting,
    Streaming,
    Completed,
    Fallback(FailureKind),
}

impl InsightsState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InsightsState::Completed | InsightsState::Fallback(_))
    }

    pub fn can_transition_to(&self, next: InsightsState) -> bool {
        use InsightsState::*;
        matches!(
            (self, next),
            (Idle, PreconditionCheck)
                | (PreconditionCheck, Requesting)
                | (PreconditionCheck, Fallback(FailureKind::ConfigurationError))
                | (Requesting, Streaming)
                | (Requesting, Fallback(_))
                | (Streaming, Completed)
                | (Streaming, Fallback(_))
        )
    }
}

/// Mutable state owned by exactly one insights request
#[derive(Debug)]
pub struct InsightsSession {
    request_id: Uuid,
    time_range: TimeRange,
    state: InsightsState,
    parser: EventStreamParser,
    budget: ToolCallBudget,
    final_content: Option<String>,
    started: Instant,
}

impl InsightsSession {
    pub fn new(time_range: TimeRange) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            time_range,
            state: InsightsState::Idle,
            parser: EventStreamParser::new(),
            budget: ToolCallBudget::new(MAX_TOOL_CALLS),
            final_content: None,
            started: Instant::now(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn state(&self) -> InsightsState {
        self.state
    }

    pub fn budget(&self) -> &ToolCallBudget {
        &self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Move to `next` if the transition is legal. Returns whether it moved.
    pub fn transition(&mut self, next: InsightsState) -> bool {
        if !self.state.can_transition_to(next) {
            debug!(
                request_id = %self.request_id,
                from = ?self.state,
                to = ?next,
                "Ignoring illegal insights state transition"
            );
            return false;
        }
        self.state = next;
        true
    }

    /// Feed a body chunk. Returns `true` once the terminal event is seen;
    /// anything after it is not read.
    pub fn ingest(&mut self, chunk: &[u8]) -> AiResult<bool> {
        let events = self.parser.feed(chunk);
        self.apply_all(events)
    }

    /// Flush the parser at end of body. Returns `true` if that produced the
    /// terminal event.
    pub fn finish(&mut self) -> AiResult<bool> {
        let events = self.parser.finish();
        self.apply_all(events)
    }

    fn apply_all(&mut self, events: Vec<Result<StreamEvent, StreamError>>) -> AiResult<bool> {
        for event in events {
            metrics::STREAM_RECORDS_TOTAL.inc();
            if self.apply(event?)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn apply(&mut self, event: StreamEvent) -> AiResult<bool> {
        if event.is_terminal() {
            debug!(request_id = %self.request_id, "Received terminal event");
            return Ok(true);
        }

        match event.event_type.as_str() {
            MESSAGE_EVENT => {
                if let Some(value) = event.json() {
                    self.apply_message(value)?;
                }
            }
            ERROR_EVENT => return Err(self.remote_error(event.json())),
            other => debug!(request_id = %self.request_id, event_type = other, "Skipping event"),
        }
        Ok(false)
    }

    fn apply_message(&mut self, value: &Value) -> AiResult<()> {
        let completion: ChatCompletion =
            serde_json::from_value(value.clone()).map_err(|e| StreamError::InvalidPayload {
                record: self.parser.records_parsed(),
                event_type: MESSAGE_EVENT.to_string(),
                reason: e.to_string(),
            })?;

        for call in completion.tool_calls() {
            metrics::AGENT_TOOL_CALLS_TOTAL.inc();
            debug!(
                request_id = %self.request_id,
                tool = call.function.as_ref().map(|f| f.name.as_str()).unwrap_or("unknown"),
                calls_made = self.budget.calls_made() + 1,
                "Agent invoked tool"
            );
            self.budget.record_call(call.id.as_deref())?;
        }

        if completion.is_tool_result() {
            if completion.any_content().is_some_and(mentions_call_limit) {
                return Err(self.budget.exceeded());
            }
            return Ok(());
        }

        if let Some(content) = completion.final_content() {
            self.final_content = Some(content.to_string());
        }
        Ok(())
    }

    fn remote_error(&self, payload: Option<&Value>) -> AiError {
        let Some(payload) = payload else {
            return AiError::Remote("error event without payload".to_string());
        };

        let code = payload
            .get("code")
            .or_else(|| payload.pointer("/error/code"))
            .and_then(Value::as_str);
        let message = payload
            .get("message")
            .or_else(|| payload.pointer("/error/message"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        if code == Some(TOOL_LIMIT_ERROR_CODE) || mentions_call_limit(message) {
            return self.budget.exceeded();
        }
        AiError::Remote(if message.is_empty() {
            payload.to_string()
        } else {
            message.to_string()
        })
    }
}

/// Insights orchestrator over the agent endpoint.
///
/// Never fails: any error at any stage becomes a fallback result. Dropping the
/// returned future drops the response stream and releases the connection.
#[derive(Clone)]
pub struct InsightsOrchestrator {
    transport: Arc<dyn InferenceTransport>,
    config: Arc<InferenceConfig>,
}

impl InsightsOrchestrator {
    pub fn new(transport: Arc<dyn InferenceTransport>, config: Arc<InferenceConfig>) -> Self {
        Self { transport, config }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.insights_timeout_secs)
    }

    /// Preflight outcome without touching the network
    pub fn readiness(&self) -> Result<(), ConfigIssue> {
        preflight::check_agent_target(&self.config).map(|_| ())
    }

    /// Produce insights for `time_range`
    pub async fn get_insights(&self, time_range: TimeRange) -> InsightResult {
        let called_at = Utc::now();
        let mut session = InsightsSession::new(time_range);

        match self.drive(&mut session).await {
            Ok(content) => {
                session.transition(InsightsState::Completed);
                metrics::record_orchestration(OPERATION, None, session.elapsed());
                info!(
                    request_id = %session.request_id,
                    time_range = %time_range,
                    elapsed_ms = session.elapsed().as_millis() as u64,
                    records_read = session.parser.records_parsed(),
                    tool_calls = session.budget.calls_made(),
                    "Insights generated"
                );
                InsightResult::from_content(content, time_range, Utc::now())
            }
            Err(err) => {
                let kind = err.classification();
                session.transition(InsightsState::Fallback(kind));
                metrics::record_orchestration(OPERATION, Some(kind), session.elapsed());
                if kind.is_persistent() {
                    error!(
                        request_id = %session.request_id,
                        time_range = %time_range,
                        classification = %kind,
                        error = %err,
                        "Insights unavailable due to configuration, returning fallback"
                    );
                } else {
                    warn!(
                        request_id = %session.request_id,
                        time_range = %time_range,
                        classification = %kind,
                        elapsed_ms = session.elapsed().as_millis() as u64,
                        bytes_read = session.parser.bytes_consumed(),
                        records_read = session.parser.records_parsed(),
                        tool_calls = session.budget.calls_made(),
                        error = %err,
                        "Insights request failed, returning fallback"
                    );
                }
                fallback::insights(time_range, Some(kind), called_at)
            }
        }
    }

    async fn drive(&self, session: &mut InsightsSession) -> AiResult<InsightContent> {
        session.transition(InsightsState::PreconditionCheck);
        let target = preflight::check_agent_target(&self.config)?;

        session.transition(InsightsState::Requesting);
        let request = build_request(&self.config, &target, session.time_range);

        let timeout = self.timeout();
        let content = tokio::time::timeout(timeout, self.exchange(session, &target.api_key, &request))
            .await
            .map_err(|_| AiError::Timeout(timeout.as_secs()))??;

        parse_insight_content(&content)
    }

    async fn exchange(
        &self,
        session: &mut InsightsSession,
        api_key: &str,
        request: &AgentRequest,
    ) -> AiResult<String> {
        let mut stream = self.transport.open_stream(api_key, request).await?;
        session.transition(InsightsState::Streaming);

        let mut terminal = false;
        while let Some(chunk) = stream.next().await {
            if session.ingest(&chunk?)? {
                terminal = true;
                break;
            }
        }
        if !terminal {
            terminal = session.finish()?;
        }
        if !terminal {
            return Err(AiError::MissingTerminal {
                records: session.parser.records_parsed(),
            });
        }

        session.final_content.take().ok_or(AiError::MissingCompletion)
    }
}

fn build_request(config: &InferenceConfig, target: &AgentTarget, time_range: TimeRange) -> AgentRequest {
    let prompt = format!(
        r#"You are a Salesforce Health Analyzer specialized in analyzing health alert data.

Please analyze the health alerts from the last {window} and provide 3 key insights:

1. Alert Pattern Detected: Identify any patterns or clusters in the alerts, such as
   increases/decreases in specific categories or notable frequency changes.

2. Potential Issue: Based on the alerts, identify a potential underlying issue
   that may need attention. Look for correlations or common root causes.

3. Suggested Action: Recommend a specific, actionable step that would help
   address the most critical issues identified.

You may run at most {max_calls} read-only queries against the health_alerts table.

Format your response as a JSON object with the following structure:
{{
    "alert_pattern": {{
        "title": "Brief pattern title",
        "description": "Detailed description with numbers and percentages"
    }},
    "potential_issue": {{
        "title": "Brief issue title",
        "description": "Detailed description of the potential issue"
    }},
    "suggested_action": {{
        "title": "Brief action title",
        "description": "Detailed description of the recommended action"
    }},
    "system_health_summary": "One sentence overall system health assessment"
}}"#,
        window = time_range.window(),
        max_calls = MAX_TOOL_CALLS,
    );

    AgentRequest {
        model: config.model_id.clone(),
        messages: vec![Message::user(prompt)],
        tools: vec![AgentTool::query_tool(
            target.app_name.clone(),
            target.db_attachment.clone(),
            config.dyno_size.clone(),
            MAX_TOOL_CALLS,
        )],
    }
}

/// Validate the agent's final answer against the insight shape
pub fn parse_insight_content(content: &str) -> AiResult<InsightContent> {
    let insight: InsightContent = parse_structured(content)?;
    let blank = insight.blank_fields();
    if !blank.is_empty() {
        return Err(AiError::Schema(format!("blank fields: {}", blank.join(", "))));
    }
    Ok(insight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> AgentTarget {
        AgentTarget {
            api_key: "inf-test".to_string(),
            app_name: "sf-health-dashboard".to_string(),
            db_attachment: "HEROKU_POSTGRESQL_COBALT".to_string(),
        }
    }

    fn message_chunk(value: Value) -> Vec<u8> {
        format!("event: message\ndata: {}\n\n", value).into_bytes()
    }

    #[test]
    fn test_state_machine_transitions() {
        use InsightsState::*;
        assert!(Idle.can_transition_to(PreconditionCheck));
        assert!(PreconditionCheck.can_transition_to(Fallback(FailureKind::ConfigurationError)));
        assert!(!PreconditionCheck.can_transition_to(Fallback(FailureKind::Timeout)));
        assert!(Streaming.can_transition_to(Completed));
        assert!(!Requesting.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Fallback(FailureKind::Timeout)));
        assert!(!Fallback(FailureKind::Timeout).can_transition_to(Idle));
        assert!(Completed.is_terminal());
    }

    #[test]
    fn test_session_rejects_illegal_transition() {
        let mut session = InsightsSession::new(TimeRange::Week);
        assert!(!session.transition(InsightsState::Streaming));
        assert_eq!(session.state(), InsightsState::Idle);
        assert!(session.transition(InsightsState::PreconditionCheck));
    }

    #[test]
    fn test_build_request_declares_query_tool() {
        let config = InferenceConfig::default();
        let request = build_request(&config, &target(), TimeRange::Day);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "claude-4-sonnet");
        assert_eq!(body["tools"][0]["name"], "postgres_run_query");
        assert_eq!(body["tools"][0]["runtime_params"]["max_calls"], 3);
        assert_eq!(
            body["tools"][0]["runtime_params"]["tool_params"]["db_attachment"],
            "HEROKU_POSTGRESQL_COBALT"
        );
        assert!(request.messages[0].content.contains("last 24 hours"));
    }

    #[test]
    fn test_session_tracks_final_content() {
        let mut session = InsightsSession::new(TimeRange::Week);
        let chunk = message_chunk(json!({"choices":[{"message":{"content":"{\"a\":1}"}}]}));
        assert!(!session.ingest(&chunk).unwrap());
        assert!(session.ingest(b"event: done\ndata: [DONE]\n\n").unwrap());
        assert_eq!(session.final_content.as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_session_counts_tool_calls() {
        let mut session = InsightsSession::new(TimeRange::Week);
        for i in 0..3 {
            let chunk = message_chunk(json!({
                "object": "chat.completion",
                "choices": [{"finish_reason": "tool_calls", "message": {"role": "assistant", "tool_calls": [
                    {"id": format!("call_{}", i), "type": "function", "function": {"name": "postgres_run_query", "arguments": "{}"}}
                ]}}]
            }));
            assert!(!session.ingest(&chunk).unwrap());
        }
        assert_eq!(session.budget().calls_made(), 3);

        let fourth = message_chunk(json!({
            "choices": [{"message": {"tool_calls": [{"id": "call_3", "function": {"name": "postgres_run_query"}}]}}]
        }));
        let err = session.ingest(&fourth).unwrap_err();
        assert!(matches!(err, AiError::BudgetExceeded { calls_made: 4, limit: 3 }));
    }

    #[test]
    fn test_session_error_events() {
        let mut session = InsightsSession::new(TimeRange::Week);
        let err = session
            .ingest(b"event: error\ndata: {\"error\":{\"code\":\"tool_call_limit_exceeded\",\"message\":\"limit\"}}\n\n")
            .unwrap_err();
        assert_eq!(err.classification(), FailureKind::ProtocolViolation);

        let mut session = InsightsSession::new(TimeRange::Week);
        let err = session
            .ingest(b"event: error\ndata: {\"message\":\"model overloaded\"}\n\n")
            .unwrap_err();
        assert_eq!(err.classification(), FailureKind::TransportFailure);
    }

    #[test]
    fn test_tool_result_limit_text_is_budget_violation() {
        let mut session = InsightsSession::new(TimeRange::Week);
        let chunk = message_chunk(json!({
            "object": "tool.completion",
            "choices": [{"message": {"role": "tool", "content": "Tool exceeded maximum calls"}}]
        }));
        let err = session.ingest(&chunk).unwrap_err();
        assert!(matches!(err, AiError::BudgetExceeded { .. }));
    }

    #[test]
    fn test_parse_insight_content() {
        let content = json!({
            "alert_pattern": {"title": "Security spike", "description": "Security alerts up 40%"},
            "potential_issue": {"title": "Profile drift", "description": "Permissions widened"},
            "suggested_action": {"title": "Audit profiles", "description": "Review admin profiles"},
            "system_health_summary": "Stable with a rise in security alerts."
        })
        .to_string();
        let insight = parse_insight_content(&content).unwrap();
        assert_eq!(insight.alert_pattern.title, "Security spike");

        let missing = json!({
            "alert_pattern": {"title": "a", "description": "b"},
            "potential_issue": {"title": "c", "description": "d"},
            "system_health_summary": "ok"
        })
        .to_string();
        assert_eq!(
            parse_insight_content(&missing).unwrap_err().classification(),
            FailureKind::SchemaMismatch
        );
    }
}
