//! In-memory fakes shared by the chat tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chatrelay_types::chat::{
    ChatMessage, ChatSession, DEFAULT_ICON, DEFAULT_SESSION_TITLE, MessageId, MessageRole,
    summary_content,
};
use chatrelay_types::config::ChatSettings;
use chatrelay_types::error::RepositoryError;
use chatrelay_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};
use chrono::Utc;
use futures_util::{StreamExt, stream};
use uuid::Uuid;

use crate::chat::repository::ChatRepository;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::provider::{CompletionStream, LlmProvider, ProviderFactory};

#[derive(Default)]
struct MemoryState {
    sessions: Vec<ChatSession>,
    messages: Vec<ChatMessage>,
    next_id: MessageId,
    summarized: bool,
}

impl MemoryState {
    fn push(&mut self, session_id: Uuid, role: MessageRole, content: &str) -> MessageId {
        let sequence = self
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .map(|m| m.sequence)
            .max()
            .unwrap_or(0)
            + 1;
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id: self.next_id,
            session_id,
            role,
            content: content.to_string(),
            sequence,
            created_at: Utc::now(),
        });
        self.next_id
    }

    fn has_session(&self, session_id: &Uuid) -> bool {
        self.sessions.iter().any(|s| &s.id == session_id)
    }
}

/// `Mutex<Vec<_>>` backed message store.
#[derive(Default)]
pub struct InMemoryChatRepository {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
    fail_appends_after_summary: AtomicBool,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session with the default title and return its id.
    pub fn seed_session(&self, system_prompt: &str) -> Uuid {
        let id = Uuid::now_v7();
        let mut state = self.state.lock().unwrap();
        state.sessions.push(ChatSession {
            id,
            title: DEFAULT_SESSION_TITLE.to_string(),
            icon: DEFAULT_ICON.to_string(),
            assistant_name: None,
            created_at: Utc::now(),
        });
        state.push(id, MessageRole::System, system_prompt);
        id
    }

    /// Add a message directly, bypassing the write-failure switch.
    pub fn seed_message(&self, session_id: Uuid, role: MessageRole, content: &str) {
        self.state.lock().unwrap().push(session_id, role, content);
    }

    /// `(role, content)` pairs of a session in sequence order.
    pub fn transcript(&self, session_id: Uuid) -> Vec<(MessageRole, String)> {
        let mut messages: Vec<ChatMessage> = self
            .state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.sequence, m.id));
        messages.into_iter().map(|m| (m.role, m.content)).collect()
    }

    pub fn title(&self, session_id: Uuid) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .map(|s| s.title.clone())
    }

    /// Make every subsequent write fail with a query error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `append_message` fail once any summary has been stored.
    pub fn fail_appends_after_summary(&self) {
        self.fail_appends_after_summary.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RepositoryError::Query("disk I/O error".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ChatRepository for InMemoryChatRepository {
    async fn create_session(
        &self,
        session: &ChatSession,
        system_prompt: &str,
    ) -> Result<ChatSession, RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        state.sessions.push(session.clone());
        state.push(session.id, MessageRole::System, system_prompt);
        Ok(session.clone())
    }

    async fn get_session(&self, session_id: &Uuid) -> Result<Option<ChatSession>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.sessions.iter().find(|s| &s.id == session_id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, RepositoryError> {
        let mut sessions = self.state.lock().unwrap().sessions.clone();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn rename_session(&self, session_id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let session = state
            .sessions
            .iter_mut()
            .find(|s| &s.id == session_id)
            .ok_or(RepositoryError::NotFound)?;
        session.title = title.to_string();
        Ok(())
    }

    async fn delete_session(&self, session_id: &Uuid) -> Result<(), RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if !state.has_session(session_id) {
            return Err(RepositoryError::NotFound);
        }
        state.sessions.retain(|s| &s.id != session_id);
        state.messages.retain(|m| &m.session_id != session_id);
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<MessageId, RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if !state.has_session(session_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.summarized && self.fail_appends_after_summary.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        Ok(state.push(*session_id, role, content))
    }

    async fn list_messages(&self, session_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut messages: Vec<ChatMessage> = self
            .state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| &m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.sequence, m.id));
        Ok(messages)
    }

    async fn delete_last_of_role(
        &self,
        session_id: &Uuid,
        role: MessageRole,
    ) -> Result<bool, RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let last = state
            .messages
            .iter()
            .filter(|m| &m.session_id == session_id && m.role == role)
            .max_by_key(|m| (m.sequence, m.id))
            .map(|m| m.id);
        match last {
            Some(id) => {
                state.messages.retain(|m| m.id != id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_with_summary(
        &self,
        session_id: &Uuid,
        system_content: &str,
        summary: &str,
        pending_user: Option<&str>,
    ) -> Result<(), RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let system = state
            .messages
            .iter_mut()
            .find(|m| &m.session_id == session_id && m.role == MessageRole::System)
            .ok_or(RepositoryError::NotFound)?;
        system.content = system_content.to_string();
        state
            .messages
            .retain(|m| &m.session_id != session_id || m.role == MessageRole::System);
        state.push(*session_id, MessageRole::Assistant, &summary_content(summary));
        if let Some(text) = pending_user {
            state.push(*session_id, MessageRole::User, text);
        }
        state.summarized = true;
        Ok(())
    }
}

/// One step of a scripted provider stream.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Delta(&'static str),
    Done,
    Fail(&'static str),
    /// Never yield again.
    Hang,
}

/// Provider that replays a fixed script and records every request.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Vec<Step>,
    summary: Option<String>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Answer non-streaming requests with `summary` instead of failing.
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent through `stream`.
    pub fn streamed_requests(&self) -> Vec<CompletionRequest> {
        self.requests().into_iter().filter(|r| r.stream).collect()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.summary {
            Some(content) => Ok(CompletionResponse {
                id: None,
                content: content.clone(),
                model: None,
            }),
            None => Err(LlmError::Provider {
                message: "summarizer unavailable".to_string(),
            }),
        }
    }

    fn stream(&self, request: CompletionRequest) -> CompletionStream {
        self.requests.lock().unwrap().push(request);

        let mut events = Vec::new();
        let mut hang = false;
        for step in &self.script {
            match step {
                Step::Delta(text) => events.push(Ok(StreamEvent::TextDelta {
                    text: text.to_string(),
                })),
                Step::Done => events.push(Ok(StreamEvent::Done)),
                Step::Fail(message) => events.push(Err(LlmError::Stream(message.to_string()))),
                Step::Hang => {
                    hang = true;
                    break;
                }
            }
        }

        let head = stream::iter(events);
        if hang {
            return Box::pin(head.chain(stream::pending()));
        }
        Box::pin(head)
    }
}

/// Factory that always hands out clones of one scripted provider.
pub struct ScriptedFactory(pub ScriptedProvider);

impl ProviderFactory for ScriptedFactory {
    fn create(&self, _settings: &ChatSettings) -> Result<BoxLlmProvider, LlmError> {
        Ok(BoxLlmProvider::new(self.0.clone()))
    }
}
