use super::role::Role;
use super::tool::ToolCallRequest;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    /// Text content, absent on assistant messages that only carry tool calls
    pub content: Option<String>,
    /// Tool invocations requested by the assistant, in the order issued
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    /// For tool messages, the id of the request this message answers
    #[serde(default)]
    pub tool_call_id: Option<String>,
    /// For tool messages, the name of the tool that produced the content
    #[serde(default)]
    pub name: Option<String>,
}

impl Message {
    fn with_role(role: Role) -> Self {
        Message {
            role,
            content: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a new system message
    pub fn system<S: Into<String>>(text: S) -> Self {
        Self::with_role(Role::System).with_text(text)
    }

    /// Create a new user message
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::with_role(Role::User).with_text(text)
    }

    /// Create a new assistant message without content
    pub fn assistant() -> Self {
        Self::with_role(Role::Assistant)
    }

    /// Create a tool result message answering the request with the given id
    pub fn tool<I, N, C>(tool_call_id: I, name: N, content: C) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        C: Into<String>,
    {
        Message {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::with_role(Role::Tool).with_text(content)
        }
    }

    /// Set the text content of the message
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.content = Some(text.into());
        self
    }

    /// Add a tool request to the message
    pub fn with_tool_call(mut self, request: ToolCallRequest) -> Self {
        self.tool_calls.push(request);
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
