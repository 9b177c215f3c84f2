use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single tool call. These never abort an orchestration pass,
/// they are handed back to the model as `{"error": ...}`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {detail}")]
    InvalidArguments { tool: String, detail: String },

    #[error("tool '{tool}' failed: {detail}")]
    ExecutionFailed { tool: String, detail: String },
}

impl ToolError {
    pub fn invalid_arguments<T: Into<String>, D: ToString>(tool: T, detail: D) -> Self {
        ToolError::InvalidArguments {
            tool: tool.into(),
            detail: detail.to_string(),
        }
    }

    pub fn failed<T: Into<String>, D: ToString>(tool: T, detail: D) -> Self {
        ToolError::ExecutionFailed {
            tool: tool.into(),
            detail: detail.to_string(),
        }
    }

    /// Name of the tool the error is attributed to, "unknown" when the call
    /// never resolved to one
    pub fn tool_name(&self) -> &str {
        match self {
            ToolError::UnknownTool(_) => "unknown",
            ToolError::InvalidArguments { tool, .. } => tool,
            ToolError::ExecutionFailed { tool, .. } => tool,
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Failure talking to the completion endpoint, after retries were applied.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum LlmError {
    #[error("LLM HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("LLM error: {0}")]
    Transport(String),

    #[error("unexpected LLM response: {0}")]
    Malformed(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Terminal failures of an orchestration pass, one per LLM call site.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AskError {
    #[error("{0}")]
    FirstCall(LlmError),

    #[error("{0}")]
    Finalize(LlmError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_messages() {
        assert_eq!(
            ToolError::UnknownTool("tarot".into()).to_string(),
            "unknown tool: tarot"
        );
        assert_eq!(
            ToolError::invalid_arguments("calc", "missing field `expr`").to_string(),
            "invalid arguments: missing field `expr`"
        );
        assert_eq!(
            ToolError::failed("calc", "division by zero").to_string(),
            "tool 'calc' failed: division by zero"
        );
    }

    #[test]
    fn test_tool_error_name() {
        assert_eq!(ToolError::UnknownTool("x".into()).tool_name(), "unknown");
        assert_eq!(ToolError::invalid_arguments("clima", "bad").tool_name(), "clima");
    }

    #[test]
    fn test_llm_error_messages() {
        let err = LlmError::Http {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "LLM HTTP 500: boom");
        assert_eq!(
            LlmError::Transport("connection refused".into()).to_string(),
            "LLM error: connection refused"
        );
    }
}
