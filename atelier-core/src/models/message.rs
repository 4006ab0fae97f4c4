use serde::{Deserialize, Serialize};

/// One chat record. Roles are free text on the wire: `user` for the shopper,
/// `<handler>_agent` for replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub const USER: &'static str = "user";

    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Self::USER, content)
    }

    pub fn is_user(&self) -> bool {
        self.role == Self::USER
    }
}

/// Content of the most recent user message, or "" when there is none.
pub fn latest_user_input(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.is_user())
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

/// `role: content` lines for the last `window` messages.
pub fn render_history(messages: &[ChatMessage], window: usize) -> String {
    let start = messages.len().saturating_sub(window);
    messages[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
