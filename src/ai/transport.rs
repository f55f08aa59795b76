use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{AiError, AiResult, ConfigIssue};

/// Body chunks of a streaming response
pub type ChunkStream = BoxStream<'static, AiResult<Vec<u8>>>;

/// Name of the query tool exposed to the agent
pub const QUERY_TOOL_NAME: &str = "postgres_run_query";

const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request for the non-streaming chat completion endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

/// Request for the agentic, streaming endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AgentRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<AgentTool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
    pub runtime_params: RuntimeParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeParams {
    pub target_app_name: String,
    pub dyno_size: String,
    pub max_calls: u32,
    pub tool_params: ToolParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolParams {
    pub db_attachment: String,
}

impl AgentTool {
    /// Read-only query tool bound to one database attachment
    pub fn query_tool(
        target_app_name: String,
        db_attachment: String,
        dyno_size: String,
        max_calls: u32,
    ) -> Self {
        Self {
            tool_type: "heroku_tool".to_string(),
            name: QUERY_TOOL_NAME.to_string(),
            runtime_params: RuntimeParams {
                target_app_name,
                dyno_size,
                max_calls,
                tool_params: ToolParams { db_attachment },
            },
        }
    }
}

/// Connection to the inference service
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    /// Send a chat request and return the raw response body.
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> AiResult<String>;

    /// Send an agent request and return the event-stream body as it arrives.
    /// Dropping the stream releases the connection.
    async fn open_stream(&self, api_key: &str, request: &AgentRequest) -> AiResult<ChunkStream>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpInferenceClient {
    client: Client,
    base_url: String,
}

impl HttpInferenceClient {
    /// Overall deadlines are enforced by the orchestrators; only the connect
    /// phase is bounded here.
    pub fn new(base_url: impl Into<String>) -> AiResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    pub fn agents_url(&self) -> String {
        format!("{}/v1/agents/heroku", self.base_url)
    }

    async fn check_status(response: reqwest::Response) -> AiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let full_body = response.text().await.unwrap_or_default();
        let rejected = full_body.to_lowercase().contains("not a replica");
        let body: String = full_body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        if rejected {
            warn!(status = status.as_u16(), "Inference service rejected the database attachment");
            return Err(ConfigIssue::RejectedByService(body).into());
        }
        Err(AiError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl InferenceTransport for HttpInferenceClient {
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> AiResult<String> {
        let url = self.chat_url();
        debug!(url = %url, model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        Ok(response.text().await?)
    }

    async fn open_stream(&self, api_key: &str, request: &AgentRequest) -> AiResult<ChunkStream> {
        let url = self.agents_url();
        debug!(url = %url, model = %request.model, "Opening agent event stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        let response = Self::check_status(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        // Some deployments answer with a single JSON completion instead of a
        // stream; present it as a one-message stream.
        if content_type.contains("application/json") {
            debug!("Agent endpoint answered with plain JSON");
            let body = response.text().await?;
            let value: serde_json::Value = serde_json::from_str(&body)
                .map_err(|e| AiError::Malformed(format!("agent response is not JSON: {}", e)))?;
            let framed = format!("event: message\ndata: {}\n\nevent: done\ndata: [DONE]\n\n", value);
            return Ok(stream::once(async move { Ok(framed.into_bytes()) }).boxed());
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(AiError::from))
            .boxed())
    }
}
