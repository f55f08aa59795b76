//! Chat-completion payload shapes and extraction of the structured JSON a
//! model writes into its message content.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::error::{AiError, AiResult};

/// `object` value of a message produced by a tool run rather than the model
pub const TOOL_COMPLETION_OBJECT: &str = "tool.completion";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<String>,
}

impl ChatCompletion {
    /// Choices of the completion; `null` and a missing key both read as none.
    pub fn choices(&self) -> impl Iterator<Item = &Choice> {
        self.choices.iter().flatten()
    }

    pub fn is_tool_result(&self) -> bool {
        self.object.as_deref() == Some(TOOL_COMPLETION_OBJECT)
            || self
                .choices()
                .filter_map(|c| c.message.as_ref())
                .any(|m| m.role.as_deref() == Some("tool"))
    }

    /// Tool invocations requested by the model in this message
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.choices()
            .filter_map(|c| c.message.as_ref())
            .flat_map(|m| m.tool_calls.iter().flatten())
    }

    /// Assistant text of a finished answer: non-empty content, no tool
    /// calls, and no finish reason other than `stop`.
    pub fn final_content(&self) -> Option<&str> {
        if self.is_tool_result() {
            return None;
        }
        self.choices().find_map(|choice| {
            let message = choice.message.as_ref()?;
            let finished = matches!(choice.finish_reason.as_deref(), None | Some("stop"));
            let content = message.content.as_deref()?;
            (finished && !message.has_tool_calls() && !content.trim().is_empty())
                .then_some(content)
        })
    }

    /// First non-empty content of any choice, regardless of finish reason
    pub fn any_content(&self) -> Option<&str> {
        self.choices()
            .filter_map(|c| c.message.as_ref())
            .filter_map(|m| m.content.as_deref())
            .find(|content| !content.trim().is_empty())
    }
}

/// Parse `text` as a JSON object, or failing that the span from the first
/// `{` to the last `}`.
pub fn extract_json_object(text: &str) -> AiResult<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if end > start => {
            match serde_json::from_str::<Value>(&trimmed[start..=end]) {
                Ok(value @ Value::Object(_)) => Ok(value),
                Ok(_) => Err(AiError::Malformed("content is not a JSON object".to_string())),
                Err(e) => Err(AiError::Malformed(format!("invalid JSON in content: {}", e))),
            }
        }
        _ => Err(AiError::Malformed(format!(
            "no JSON object in content ({} chars)",
            trimmed.len()
        ))),
    }
}

/// Extract a JSON object from `text` and deserialize it into `T`. Text that
/// holds no object is `Malformed`; an object of the wrong shape is `Schema`.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> AiResult<T> {
    let value = extract_json_object(text)?;
    serde_json::from_value(value).map_err(|e| AiError::Schema(e.to_string()))
}
