use std::collections::HashSet;

use super::error::AiError;

/// Tool invocations the agent may make per insights request
pub const MAX_TOOL_CALLS: u32 = 3;

/// Error code of the structured "tool call limit exceeded" signal
pub const TOOL_LIMIT_ERROR_CODE: &str = "tool_call_limit_exceeded";

/// Per-request tool invocation counter. Exceeding the limit fails the request;
/// it is never retried.
#[derive(Debug, Clone)]
pub struct ToolCallBudget {
    calls_made: u32,
    limit: u32,
    seen_ids: HashSet<String>,
}

impl Default for ToolCallBudget {
    fn default() -> Self {
        Self::new(MAX_TOOL_CALLS)
    }
}

impl ToolCallBudget {
    pub fn new(limit: u32) -> Self {
        Self {
            calls_made: 0,
            limit,
            seen_ids: HashSet::new(),
        }
    }

    pub fn calls_made(&self) -> u32 {
        self.calls_made
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.calls_made)
    }

    /// Count one invocation. A repeated id (the same call echoed in a later
    /// message) is not counted twice.
    pub fn record_call(&mut self, id: Option<&str>) -> Result<(), AiError> {
        if let Some(id) = id {
            if !self.seen_ids.insert(id.to_string()) {
                return Ok(());
            }
        }
        self.calls_made += 1;
        if self.calls_made > self.limit {
            return Err(self.exceeded());
        }
        Ok(())
    }

    /// The error for a limit violation, whether counted here or reported by
    /// the remote service.
    pub fn exceeded(&self) -> AiError {
        AiError::BudgetExceeded {
            calls_made: self.calls_made,
            limit: self.limit,
        }
    }
}

/// Compatibility shim for services that report the limit only as free text.
pub fn mentions_call_limit(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("exceeded") && text.contains("maximum") && text.contains("call")
}
