//! Error types for the AI orchestration layer
//!
//! None of these leave an orchestrator: each one is classified, logged and
//! turned into a fallback result at the boundary.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Result type for orchestration steps
pub type AiResult<T> = std::result::Result<T, AiError>;

/// Failure classification reported on fallback results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Missing or invalid credentials or replica attachment; persistent
    ConfigurationError,
    /// Connection refused, DNS, HTTP error status, mid-stream disconnect
    TransportFailure,
    /// Wall-clock budget exceeded
    Timeout,
    /// Broken event-stream framing or tool-call budget exceeded
    ProtocolViolation,
    /// Payload present but missing required fields or wrong types
    SchemaMismatch,
    /// Response body or completion text is not structured data at all
    MalformedResponse,
}

impl FailureKind {
    /// Persistent conditions that need an operator, as opposed to transient ones
    pub fn is_persistent(&self) -> bool {
        matches!(self, FailureKind::ConfigurationError)
    }
}

/// A configuration problem found before any network call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigIssue {
    #[error("no inference API key configured")]
    MissingApiKey,

    #[error("no application name configured for the agent sandbox")]
    MissingAppName,

    #[error("no read-only database attachment configured")]
    MissingAttachment,

    #[error("database attachment {0} is not a follower (read-only replica)")]
    AttachmentNotFollower(String),

    #[error("target database is not a replica: {0}")]
    RejectedByService(String),
}

/// Errors raised while talking to the inference service
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigIssue),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Inference service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Remote service reported an error: {0}")]
    Remote(String),

    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed event stream: {0}")]
    Stream(#[from] StreamError),

    #[error("Stream ended without a terminal event after {records} records")]
    MissingTerminal { records: usize },

    #[error("Terminal event reached without a completion message")]
    MissingCompletion,

    #[error("Tool call budget exceeded: {calls_made} calls against a limit of {limit}")]
    BudgetExceeded { calls_made: u32, limit: u32 },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Schema mismatch: {0}")]
    Schema(String),
}

impl AiError {
    pub fn classification(&self) -> FailureKind {
        match self {
            AiError::Configuration(_) => FailureKind::ConfigurationError,
            AiError::Transport(_) | AiError::HttpStatus { .. } | AiError::Remote(_) => {
                FailureKind::TransportFailure
            }
            AiError::Timeout(_) => FailureKind::Timeout,
            AiError::Stream(_)
            | AiError::MissingTerminal { .. }
            | AiError::MissingCompletion
            | AiError::BudgetExceeded { .. } => FailureKind::ProtocolViolation,
            AiError::Malformed(_) => FailureKind::MalformedResponse,
            AiError::Schema(_) => FailureKind::SchemaMismatch,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiError::Transport(format!("request timed out: {}", err))
        } else if err.is_decode() {
            AiError::Malformed(err.to_string())
        } else {
            AiError::Transport(err.to_string())
        }
    }
}

/// Framing errors from the event-stream parser
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("record {record} has data but no event line")]
    MissingEventType { record: usize },

    #[error("record {record} ({event_type}) carries unparseable data: {reason}")]
    InvalidPayload {
        record: usize,
        event_type: String,
        reason: String,
    },

    #[error("stream is not valid UTF-8 at byte {offset}")]
    InvalidUtf8 { offset: usize },
}
