use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::utils::openai_response_to_message;
use crate::errors::LlmResult;
use crate::models::message::Message;
use crate::models::tool::ToolSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// A successful completion. The payload is known to carry at least one
/// choice; everything below that is only checked when the message is read.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub payload: Value,
    pub usage: Usage,
}

impl Completion {
    pub fn new(payload: Value, usage: Usage) -> Self {
        Self { payload, usage }
    }

    /// The assistant message of the first choice
    pub fn message(&self) -> Result<Message> {
        openai_response_to_message(&self.payload)
    }
}

/// Base trait for chat completion backends
#[async_trait]
pub trait Provider: Send + Sync {
    /// Request the next assistant message for the conversation, letting the
    /// model decide whether to call one of `tools`.
    ///
    /// Implementations resolve every failure into an `LlmError`, they never
    /// panic or hang past their own timeouts.
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> LlmResult<Completion>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_serialization() -> Result<()> {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        let json_value = serde_json::to_value(&usage)?;
        assert_eq!(json_value["input_tokens"], json!(10));
        assert_eq!(json_value["output_tokens"], json!(20));
        assert_eq!(json_value["total_tokens"], json!(30));
        Ok(())
    }

    #[test]
    fn test_completion_message() -> Result<()> {
        let completion = Completion::new(
            json!({"choices": [{"message": {"role": "assistant", "content": "Hola"}}]}),
            Usage::default(),
        );
        assert_eq!(completion.message()?.text(), Some("Hola"));
        Ok(())
    }
}
