//! Prompt payloads sent to LLM providers.

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the conversation.
    System,
    /// The caller's request.
    User,
    /// A previous model reply.
    Assistant,
}

/// One message of a chat-style prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The form of prompt a provider is primarily built around.
///
/// Callers use this to pick between a single self-contained text prompt and a
/// system + user message pair. Providers accept both forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// One text prompt with the item embedded in it.
    SingleText,
    /// A system message with instructions and a user message with the item.
    Chat,
}

/// The content of one LLM request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    /// A single self-contained text prompt.
    Text(String),
    /// An ordered list of chat messages.
    Chat(Vec<ChatMessage>),
}

impl Prompt {
    /// Returns `true` if there is no non-whitespace content to send.
    pub fn is_empty(&self) -> bool {
        match self {
            Prompt::Text(text) => text.trim().is_empty(),
            Prompt::Chat(messages) => messages.iter().all(|m| m.content.trim().is_empty()),
        }
    }
}
