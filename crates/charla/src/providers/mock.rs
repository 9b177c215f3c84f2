use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::errors::LlmResult;
use crate::models::message::Message;
use crate::models::tool::ToolSchema;
use crate::providers::base::{Completion, Provider, Usage};

/// A request as seen by the mock provider
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
}

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Mutex<VecDeque<LlmResult<Completion>>>,
    repeat: Option<LlmResult<Completion>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<LlmResult<Completion>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers every request with the same response
    pub fn repeating(response: LlmResult<Completion>) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> LlmResult<Completion> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });

        let next = self.responses.lock().unwrap().pop_front();
        match (next, &self.repeat) {
            (Some(response), _) => response,
            (None, Some(response)) => response.clone(),
            // Empty assistant message once the script runs out
            (None, None) => Ok(completion(json!({"role": "assistant", "content": ""}))),
        }
    }
}

/// Wrap a raw `message` object into a single-choice completion
pub fn completion(message: Value) -> Completion {
    Completion::new(
        json!({"choices": [{"index": 0, "message": message}]}),
        Usage::default(),
    )
}

pub fn text_completion(text: &str) -> Completion {
    completion(json!({"role": "assistant", "content": text}))
}

/// A completion requesting the given `(id, name, arguments)` tool calls
pub fn tool_call_completion(calls: &[(&str, &str, &str)]) -> Completion {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, arguments)| {
            json!({
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": arguments}
            })
        })
        .collect();
    completion(json!({"role": "assistant", "content": null, "tool_calls": tool_calls}))
}
