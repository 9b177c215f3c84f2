use serde::{Deserialize, Serialize};

use super::message::Message;

/// A prior conversation turn as supplied by the caller. Nothing about it is
/// trusted: the role may be anything and the content may be blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl HistoryEntry {
    pub fn new<R: Into<String>, C: Into<String>>(role: R, content: C) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
        }
    }
}

/// Keep only user, assistant and system turns with non-blank content.
///
/// Roles are matched case-insensitively and content is trimmed. Relative
/// order is preserved since it is the conversational order.
pub fn sanitize_history(history: &[HistoryEntry]) -> Vec<Message> {
    history
        .iter()
        .filter_map(|entry| {
            let content = entry.content.as_deref().unwrap_or_default().trim();
            if content.is_empty() {
                return None;
            }
            let message = match entry.role.trim().to_lowercase().as_str() {
                "user" => Message::user(content),
                "assistant" => Message::assistant().with_text(content),
                "system" => Message::system(content),
                _ => return None,
            };
            Some(message)
        })
        .collect()
}
