//! ChatRepository trait definition.
//!
//! The message store: sessions plus an ordered, per-session message log.

use chatrelay_types::chat::{ChatMessage, ChatSession, MessageId, MessageRole};
use chatrelay_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for chat session and message persistence.
///
/// Implementations live in chatrelay-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: Send + Sync {
    /// Create a session together with its system-prompt message.
    ///
    /// Both rows are written atomically; the system message gets the first
    /// sequence number.
    fn create_session(
        &self,
        session: &ChatSession,
        system_prompt: &str,
    ) -> impl std::future::Future<Output = Result<ChatSession, RepositoryError>> + Send;

    /// Get a chat session by its unique ID.
    fn get_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// List all sessions, newest first.
    fn list_sessions(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, RepositoryError>> + Send;

    /// Set a session's title. `NotFound` for unknown sessions.
    fn rename_session(
        &self,
        session_id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a session and its messages. `NotFound` for unknown sessions.
    fn delete_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a message with the session's next sequence number.
    fn append_message(
        &self,
        session_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> impl std::future::Future<Output = Result<MessageId, RepositoryError>> + Send;

    /// All messages of a session in sequence order.
    ///
    /// An empty list means the session does not exist.
    fn list_messages(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Delete the most recent message with `role`.
    ///
    /// Returns whether a message was deleted.
    fn delete_last_of_role(
        &self,
        session_id: &Uuid,
        role: MessageRole,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Atomically collapse the history to the system prompt plus one
    /// assistant message carrying `summary`.
    ///
    /// Deletes every non-system message, overwrites the system message with
    /// `system_content`, and appends `"Previous conversation summary: {summary}"`.
    /// When `pending_user` is set it is stored again as a user message after
    /// the summary, in the same transaction.
    fn replace_with_summary(
        &self,
        session_id: &Uuid,
        system_content: &str,
        summary: &str,
        pending_user: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
