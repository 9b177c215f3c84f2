use anyhow::{anyhow, Result};
use serde_json::{json, Map, Value};

use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{ToolCallRequest, ToolSchema};

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut converted = Map::new();
            converted.insert("role".to_string(), json!(message.role));
            converted.insert("content".to_string(), json!(message.content));

            if !message.tool_calls.is_empty() {
                let tool_calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments,
                            }
                        })
                    })
                    .collect();
                converted.insert("tool_calls".to_string(), Value::Array(tool_calls));
            }

            if message.role == Role::Tool {
                if let Some(id) = &message.tool_call_id {
                    converted.insert("tool_call_id".to_string(), json!(id));
                }
                if let Some(name) = &message.name {
                    converted.insert("name".to_string(), json!(name));
                }
            }

            Value::Object(converted)
        })
        .collect()
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[ToolSchema]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to internal Message format
///
/// A missing or null `message` reads as an empty assistant message; any
/// other shape mismatch is an error naming the offending field.
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let choice = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .ok_or_else(|| anyhow!("response has no choices[0]"))?;
    if !choice.is_object() {
        return Err(anyhow!("choices[0] is not an object"));
    }

    let original = match choice.get("message") {
        None | Some(Value::Null) => return Ok(Message::assistant()),
        Some(Value::Object(message)) => message,
        Some(_) => return Err(anyhow!("choices[0].message is not an object")),
    };

    let mut message = Message::assistant();

    match original.get("content") {
        None | Some(Value::Null) => {}
        Some(Value::String(text)) => message = message.with_text(text.as_str()),
        Some(_) => return Err(anyhow!("choices[0].message.content is not a string")),
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|v| v.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default();
            let function_name = tool_call["function"]["name"].as_str().unwrap_or_default();
            // Some compatible servers send the arguments as an object
            let arguments = match &tool_call["function"]["arguments"] {
                Value::String(text) => text.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            message = message.with_tool_call(ToolCallRequest::new(id, function_name, arguments));
        }
    }

    Ok(message)
}

/// Cut `text` to at most `max_chars` characters without splitting one
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}
