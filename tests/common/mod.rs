//! Shared fixtures for the orchestration tests: scripted inference
//! transports and ready-to-use configuration.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde_json::{json, Value};
use sf_health_analyzer::ai::{
    AgentRequest, AiError, AiResult, ChatRequest, ChunkStream, InferenceTransport,
};
use sf_health_analyzer::config::InferenceConfig;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Configuration that passes every preflight check without touching the
/// process environment
pub fn ready_config() -> InferenceConfig {
    InferenceConfig {
        api_key: Some("inf-test-key".to_string()),
        api_key_env: Vec::new(),
        app_name: Some("sf-health-dashboard".to_string()),
        app_name_env: Vec::new(),
        db_attachment: Some("HEROKU_POSTGRESQL_COBALT".to_string()),
        attachment_is_follower: true,
        ..Default::default()
    }
}

/// How the fake answers each call
#[derive(Clone)]
pub enum Script {
    /// Chat completion body / event-stream chunks, delivered as given
    Respond { body: String, chunks: Vec<Vec<u8>> },
    /// Never answers
    Hang,
    /// Deliver the chunks, then never end the stream
    StallAfter(Vec<Vec<u8>>),
    /// Like `StallAfter`, raising the flag once the stream is dropped
    StallTracked(Vec<Vec<u8>>, Arc<AtomicBool>),
    /// Fail before any byte arrives
    Fail(fn() -> AiError),
}

/// Scripted stand-in for the inference service
pub struct FakeTransport {
    script: Script,
    calls: AtomicUsize,
    last_agent_request: Mutex<Option<AgentRequest>>,
    last_chat_request: Mutex<Option<ChatRequest>>,
}

impl FakeTransport {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            last_agent_request: Mutex::new(None),
            last_chat_request: Mutex::new(None),
        })
    }

    /// A stream delivering `body` in one chunk
    pub fn streaming(body: impl Into<String>) -> Arc<Self> {
        Self::new(Script::Respond {
            body: String::new(),
            chunks: vec![body.into().into_bytes()],
        })
    }

    /// A stream delivering `body` in chunks of `size` bytes
    pub fn streaming_in_chunks(body: &str, size: usize) -> Arc<Self> {
        Self::new(Script::Respond {
            body: String::new(),
            chunks: body.as_bytes().chunks(size).map(<[u8]>::to_vec).collect(),
        })
    }

    /// A chat completion endpoint answering with `body`
    pub fn completing(body: impl Into<String>) -> Arc<Self> {
        Self::new(Script::Respond {
            body: body.into(),
            chunks: Vec::new(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_agent_request(&self) -> Option<AgentRequest> {
        self.last_agent_request.lock().unwrap().clone()
    }

    pub fn last_chat_request(&self) -> Option<ChatRequest> {
        self.last_chat_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceTransport for FakeTransport {
    async fn complete(&self, _api_key: &str, request: &ChatRequest) -> AiResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_chat_request.lock().unwrap() = Some(request.clone());

        match &self.script {
            Script::Respond { body, .. } => Ok(body.clone()),
            Script::Hang | Script::StallAfter(_) | Script::StallTracked(..) => {
                futures::future::pending().await
            }
            Script::Fail(make) => Err(make()),
        }
    }

    async fn open_stream(&self, _api_key: &str, request: &AgentRequest) -> AiResult<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_agent_request.lock().unwrap() = Some(request.clone());

        match &self.script {
            Script::Respond { chunks, .. } => {
                Ok(stream::iter(chunks.clone().into_iter().map(Ok)).boxed())
            }
            Script::Hang => futures::future::pending().await,
            Script::StallAfter(chunks) => Ok(stream::iter(chunks.clone().into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
            Script::StallTracked(chunks, dropped) => {
                let guard = DropFlag(dropped.clone());
                Ok(stream::iter(chunks.clone().into_iter().map(Ok))
                    .chain(stream::pending())
                    .map(move |chunk| {
                        let _held = &guard;
                        chunk
                    })
                    .boxed())
            }
            Script::Fail(make) => Err(make()),
        }
    }
}

/// Raises its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// One `message` record
pub fn message_event(payload: Value) -> String {
    format!("event: message\ndata: {}\n\n", payload)
}

/// Assistant message invoking the query tool
pub fn tool_call_event(id: &str) -> String {
    message_event(json!({
        "object": "chat.completion",
        "choices": [{
            "finish_reason": "tool_calls",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {
                        "name": "postgres_run_query",
                        "arguments": "{\"query\":\"SELECT category, COUNT(*) FROM health_alerts GROUP BY category\"}"
                    }
                }]
            }
        }]
    }))
}

/// Tool output relayed back by the agent runtime
pub fn tool_result_event(text: &str) -> String {
    message_event(json!({
        "object": "tool.completion",
        "choices": [{"message": {"role": "tool", "content": text}}]
    }))
}

/// Final assistant answer carrying `content`
pub fn final_event(content: &str) -> String {
    message_event(json!({
        "object": "chat.completion",
        "choices": [{"finish_reason": "stop", "message": {"role": "assistant", "content": content}}]
    }))
}

pub const DONE_EVENT: &str = "event: done\ndata: [DONE]\n\n";

/// End-of-stream sentinel sent without an event line
pub const BARE_DONE: &str = "data: [DONE]\n\n";

/// A complete, valid insights answer
pub fn insight_json() -> String {
    json!({
        "alert_pattern": {
            "title": "Security alerts rising",
            "description": "Security alerts grew 40% week over week, 12 of 30 total."
        },
        "potential_issue": {
            "title": "Profile permission drift",
            "description": "Several admin profiles gained Modify All Data."
        },
        "suggested_action": {
            "title": "Audit admin profiles",
            "description": "Review and revoke excess permissions on admin profiles."
        },
        "system_health_summary": "Stable overall, with a rise in security alerts."
    })
    .to_string()
}

/// Final assistant answer as sent by services that null out absent fields
pub fn final_event_null_tool_calls(content: &str) -> String {
    message_event(json!({
        "object": "chat.completion",
        "choices": [{
            "finish_reason": "stop",
            "message": {"role": "assistant", "content": content, "tool_calls": null}
        }]
    }))
}

/// Chat completion body whose content is `content`
pub fn chat_completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "finish_reason": "stop", "message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}
