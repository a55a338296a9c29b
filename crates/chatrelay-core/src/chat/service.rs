//! Session lifecycle: create, list, fetch, rename and delete.
//!
//! SessionService sits on the same `ChatRepository` and `SessionLocks` as
//! the relay so deleting a session waits for any in-flight turn on it.

use std::sync::Arc;

use chatrelay_types::chat::{ChatMessage, ChatSession, DEFAULT_ICON, DEFAULT_SESSION_TITLE, SessionView};
use chatrelay_types::config::ChatSettings;
use chatrelay_types::error::ChatError;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::chat::repository::ChatRepository;
use crate::chat::session::SessionLocks;

/// Orchestrates chat session lifecycle.
///
/// Generic over `ChatRepository` to maintain clean architecture
/// (chatrelay-core never depends on chatrelay-infra).
pub struct SessionService<R: ChatRepository> {
    repo: Arc<R>,
    locks: SessionLocks,
}

impl<R: ChatRepository> SessionService<R> {
    pub fn new(repo: Arc<R>, locks: SessionLocks) -> Self {
        Self { repo, locks }
    }

    /// Access the chat repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Create a session seeded with a system prompt.
    ///
    /// A blank or missing `prompt` falls back to the first configured
    /// persona. Icon and assistant name come from the persona whose prompt
    /// text matches, if any.
    pub async fn create_session(
        &self,
        settings: &ChatSettings,
        prompt: Option<&str>,
    ) -> Result<ChatSession, ChatError> {
        let prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| settings.default_prompt())
            .to_string();
        let persona = settings.persona_for_prompt(&prompt);

        let session = ChatSession {
            id: Uuid::now_v7(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            icon: persona
                .map(|p| p.icon.clone())
                .unwrap_or_else(|| DEFAULT_ICON.to_string()),
            assistant_name: persona.and_then(|p| p.assistant_name.clone()),
            created_at: Utc::now(),
        };

        let session = self.repo.create_session(&session, &prompt).await?;
        info!(session_id = %session.id, persona = persona.map(|p| p.title.as_str()), "Session created");
        Ok(session)
    }

    /// All sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<ChatSession>, ChatError> {
        Ok(self.repo.list_sessions().await?)
    }

    /// A session's messages with its display metadata.
    ///
    /// `NotFound` when the session is unknown or has no messages.
    pub async fn get_session(&self, session_id: &Uuid) -> Result<SessionView, ChatError> {
        let messages = self.repo.list_messages(session_id).await?;
        if messages.is_empty() {
            return Err(ChatError::NotFound);
        }
        let session = self
            .repo
            .get_session(session_id)
            .await?
            .ok_or(ChatError::NotFound)?;

        Ok(SessionView {
            session,
            messages: messages.iter().map(ChatMessage::to_message).collect(),
        })
    }

    /// Set a session's title. Blank titles are rejected.
    pub async fn rename_session(&self, session_id: &Uuid, title: &str) -> Result<(), ChatError> {
        if title.trim().is_empty() {
            return Err(ChatError::InvalidInput("title must not be empty".to_string()));
        }
        self.repo.rename_session(session_id, title).await?;
        info!(session_id = %session_id, "Session renamed");
        Ok(())
    }

    /// Delete a session and its messages.
    ///
    /// Waits for an in-flight turn on the session to commit first.
    pub async fn delete_session(&self, session_id: &Uuid) -> Result<(), ChatError> {
        let guard = self.locks.acquire(*session_id).await;
        let result = self.repo.delete_session(session_id).await;
        drop(guard);
        result?;

        self.locks.forget(session_id);
        info!(session_id = %session_id, "Session deleted");
        Ok(())
    }
}
