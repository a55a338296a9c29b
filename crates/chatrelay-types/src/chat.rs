//! Chat session and message types for chatrelay.
//!
//! A session is a persisted conversation; its messages carry a
//! per-session sequence number that fixes their order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;
use crate::llm::Message;

/// Title given to every session until its first exchange completes.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Icon used when a session's system prompt matches no persona.
pub const DEFAULT_ICON: &str = "bot.svg";

/// System prompt used when no persona is configured at all.
pub const FALLBACK_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Prefix of the assistant message that stands in for summarized history.
pub const SUMMARY_PREFIX: &str = "Previous conversation summary: ";

/// Maximum number of characters kept when deriving a title from the first
/// user message.
pub const TITLE_MAX_CHARS: usize = 40;

/// Identifier of a persisted message, assigned by storage.
pub type MessageId = i64;

/// A persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub icon: String,
    pub assistant_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single persisted message within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Position within the session; strictly increasing in listing order.
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// The provider-facing `{role, content}` pair for this message.
    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}

/// A session's full message log together with its display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session: ChatSession,
    pub messages: Vec<Message>,
}

/// Build the stored content of the assistant message that replaces
/// summarized history.
pub fn summary_content(summary: &str) -> String {
    format!("{SUMMARY_PREFIX}{summary}")
}
