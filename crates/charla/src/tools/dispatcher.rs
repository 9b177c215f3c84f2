use futures::FutureExt;
use serde_json::{json, Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

use super::registry::ToolRegistry;
use super::ToolArgs;
use crate::errors::{ToolError, ToolResult};
use crate::models::tool::ToolSchema;

/// Runs tool calls requested by the model. Every outcome, including a
/// failure, comes back as a json value the model can read.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.registry.schemas()
    }

    /// Run `name` with its raw json `arguments`, reporting failures as
    /// `{"error": "<message>"}`
    pub async fn invoke(&self, name: &str, arguments: &str) -> Value {
        match self.try_invoke(name, arguments).await {
            Ok(result) => {
                debug!(tool = name, "tool call succeeded");
                result
            }
            Err(e) => {
                warn!(tool = e.tool_name(), error = %e, "tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    /// Decode, resolve, validate and run one call
    pub async fn try_invoke(&self, name: &str, arguments: &str) -> ToolResult<Value> {
        let raw = decode_arguments(name, arguments)?;

        let (tool, handler) = self
            .registry
            .resolve(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let args = ToolArgs::decode(tool, raw)?;

        AssertUnwindSafe(handler.invoke(args))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ToolError::failed(tool.as_ref(), panic_message(&*panic))))
    }
}

/// Parse the argument text into a json mapping, empty text meaning `{}`
fn decode_arguments(name: &str, arguments: &str) -> ToolResult<Map<String, Value>> {
    let tool = if name.is_empty() { "unknown" } else { name };
    if arguments.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ToolError::invalid_arguments(
            tool,
            format!("expected a json object, got {}", other),
        )),
        Err(e) => Err(ToolError::invalid_arguments(tool, e)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_string()
    }
}
