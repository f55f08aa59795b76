//! AI orchestration: alert categorization and agent-backed insights.
//!
//! Both orchestrators are total. Callers always receive a well-formed result;
//! failures surface as fallback results tagged with a [`FailureKind`].

pub mod budget;
pub mod categorizer;
pub mod completion;
pub mod error;
pub mod fallback;
pub mod insights;
pub mod normalizer;
pub mod preflight;
pub mod stream;
pub mod transport;

pub use budget::{ToolCallBudget, MAX_TOOL_CALLS};
pub use categorizer::AlertCategorizer;
pub use error::{AiError, AiResult, ConfigIssue, FailureKind, StreamError};
pub use insights::{InsightsOrchestrator, InsightsSession, InsightsState};
pub use normalizer::{CategoryNormalizer, DEFAULT_SIMILARITY_THRESHOLD};
pub use stream::{EventStreamParser, StreamData, StreamEvent};
pub use transport::{
    AgentRequest, AgentTool, ChatRequest, ChunkStream, HttpInferenceClient, InferenceTransport,
    Message,
};
