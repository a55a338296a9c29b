//! Completion relay: one chat turn from user text to committed reply.
//!
//! A turn validates its input, takes the session lock, makes the user
//! message durable, optionally summarizes an over-grown history, then hands
//! the provider stream to a producer task. That task forwards every text
//! delta to the caller over a bounded channel while accumulating the same
//! deltas, and commits the accumulator as one assistant message on every
//! exit path: end of stream, provider error, idle timeout, or the caller
//! dropping the reply stream.

use std::sync::Arc;
use std::time::Duration;

use chatrelay_types::chat::{ChatMessage, MessageId, MessageRole};
use chatrelay_types::config::ChatSettings;
use chatrelay_types::error::ChatError;
use chatrelay_types::llm::{CompletionRequest, LlmError, Message, StreamEvent};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::chat::repository::ChatRepository;
use crate::chat::session::{SessionGuard, SessionLocks};
use crate::chat::summarizer::ContextSummarizer;
use crate::chat::title::title_from_first_message;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::context_sizer::ContextSizer;
use crate::llm::provider::{CompletionStream, ProviderFactory};

/// Chunks buffered between the producer task and a slow reader.
const REPLY_CHANNEL_CAPACITY: usize = 64;

/// Output budget for the summarization call.
const SUMMARY_MAX_TOKENS: u32 = 1024;

/// Prefix of the in-band notice sent when the provider fails mid-turn.
pub const PROVIDER_ERROR_PREFIX: &str = "\nError connecting to LLM: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Chat,
    Regenerate,
}

impl TurnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnKind::Chat => "chat",
            TurnKind::Regenerate => "regenerate",
        }
    }
}

/// How the provider stream ended.
#[derive(Debug)]
pub enum StreamEnd {
    /// The provider signalled the end of the reply.
    Completed,
    /// The caller dropped the reply stream.
    Cancelled,
    /// A provider error or idle timeout ended the stream.
    Failed(ChatError),
}

impl StreamEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEnd::Completed => "completed",
            StreamEnd::Cancelled => "cancelled",
            StreamEnd::Failed(_) => "failed",
        }
    }
}

/// Result of a committed turn.
#[derive(Debug)]
pub struct TurnOutcome {
    pub message_id: MessageId,
    /// The committed assistant text, exactly the deltas the caller was sent.
    pub reply: String,
    pub end: StreamEnd,
}

/// A dispatched turn.
///
/// Dropping `reply` cancels the turn; the partial reply is still committed
/// and `completion` resolves once the commit is done.
pub struct ChatTurn {
    pub reply: ReceiverStream<String>,
    pub completion: JoinHandle<Result<TurnOutcome, ChatError>>,
}

/// Orchestrates chat and regenerate turns against one message store.
pub struct CompletionRelay<R: ChatRepository> {
    repo: Arc<R>,
    providers: Arc<dyn ProviderFactory>,
    locks: SessionLocks,
}

impl<R: ChatRepository + 'static> CompletionRelay<R> {
    pub fn new(repo: Arc<R>, providers: Arc<dyn ProviderFactory>, locks: SessionLocks) -> Self {
        Self {
            repo,
            providers,
            locks,
        }
    }

    /// Start a chat turn with the user's `text`.
    ///
    /// Fails before any output with `InvalidInput` for blank text,
    /// `Configuration` when no provider is configured, `NotFound` for an
    /// unknown session and `Storage` when the user message cannot be saved.
    pub async fn chat(
        &self,
        settings: &ChatSettings,
        session_id: Uuid,
        text: &str,
    ) -> Result<ChatTurn, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }
        let provider = self.provider_for(settings)?;
        let guard = self.locks.acquire(session_id).await;

        let history = self.repo.list_messages(&session_id).await?;
        if history.is_empty() {
            return Err(ChatError::NotFound);
        }
        let first_exchange = history.len() <= 1;

        self.repo
            .append_message(&session_id, MessageRole::User, text)
            .await?;
        let mut working: Vec<Message> = history.iter().map(ChatMessage::to_message).collect();
        working.push(Message::user(text));

        if settings.summarization_enabled
            && ContextSizer::needs_pruning(&working, ContextSizer::pruning_threshold(settings))
        {
            if let Some(pruned) = self
                .prune(&provider, settings, session_id, &history, text)
                .await?
            {
                working = pruned;
            }
        }

        let title = first_exchange.then(|| title_from_first_message(text));
        Ok(self.dispatch(
            provider,
            settings,
            session_id,
            working,
            guard,
            TurnKind::Chat,
            title,
        ))
    }

    /// Replace the most recent assistant reply with a fresh one.
    ///
    /// Sends the remaining history unchanged: no new user message, no
    /// pruning and no title change.
    pub async fn regenerate(
        &self,
        settings: &ChatSettings,
        session_id: Uuid,
    ) -> Result<ChatTurn, ChatError> {
        let provider = self.provider_for(settings)?;
        let guard = self.locks.acquire(session_id).await;

        if self.repo.list_messages(&session_id).await?.is_empty() {
            return Err(ChatError::NotFound);
        }
        if !self
            .repo
            .delete_last_of_role(&session_id, MessageRole::Assistant)
            .await?
        {
            return Err(ChatError::NothingToRegenerate);
        }

        let working = self
            .repo
            .list_messages(&session_id)
            .await?
            .iter()
            .map(ChatMessage::to_message)
            .collect();

        Ok(self.dispatch(
            provider,
            settings,
            session_id,
            working,
            guard,
            TurnKind::Regenerate,
            None,
        ))
    }

    fn provider_for(&self, settings: &ChatSettings) -> Result<BoxLlmProvider, ChatError> {
        if settings.provider_url().is_none() {
            return Err(ChatError::Configuration(
                "provider_url is not configured".to_string(),
            ));
        }
        self.providers
            .create(settings)
            .map_err(|e| ChatError::Configuration(e.to_string()))
    }

    /// Summarize `history` and swap the digest in for it.
    ///
    /// Returns the rebuilt working history, or `None` when summarization
    /// failed and the turn should go on with the full history. The pending
    /// user message is already stored, so the swap carries it over in the
    /// same transaction.
    async fn prune(
        &self,
        provider: &BoxLlmProvider,
        settings: &ChatSettings,
        session_id: Uuid,
        history: &[ChatMessage],
        text: &str,
    ) -> Result<Option<Vec<Message>>, ChatError> {
        let Some(system) = history.iter().find(|m| m.role == MessageRole::System) else {
            warn!(session_id = %session_id, "Session has no system message; skipping summarization");
            return Ok(None);
        };

        let conversation: Vec<Message> = history.iter().map(ChatMessage::to_message).collect();
        let summary = match ContextSummarizer::summarize(
            provider,
            &conversation,
            Some(SUMMARY_MAX_TOKENS),
            settings.model.as_deref(),
        )
        .await
        {
            Ok(summary) if !summary.is_empty() => summary,
            Ok(_) => {
                warn!(session_id = %session_id, "Summarizer returned an empty digest; keeping full history");
                return Ok(None);
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Summarization failed; keeping full history");
                return Ok(None);
            }
        };

        self.repo
            .replace_with_summary(&session_id, &system.content, &summary, Some(text))
            .await?;

        let persisted = self.repo.list_messages(&session_id).await?;
        info!(
            session_id = %session_id,
            summarized = history.len().saturating_sub(1),
            "Replaced history with summary"
        );
        Ok(Some(persisted.iter().map(ChatMessage::to_message).collect()))
    }

    /// Spawn the producer task for an assembled request.
    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &self,
        provider: BoxLlmProvider,
        settings: &ChatSettings,
        session_id: Uuid,
        messages: Vec<Message>,
        guard: SessionGuard,
        kind: TurnKind,
        title: Option<String>,
    ) -> ChatTurn {
        let request = CompletionRequest {
            model: settings.model.clone(),
            messages,
            max_tokens: settings.max_tokens(),
            stream: true,
        };
        let idle_timeout = settings.provider_timeout();
        let span = info_span!(
            "chat_turn",
            session_id = %session_id,
            kind = kind.as_str(),
            provider = provider.name(),
        );
        debug!(session_id = %session_id, messages = request.messages.len(), "Dispatching completion request");
        let events = provider.stream(request);

        let (tx, rx) = mpsc::channel(REPLY_CHANNEL_CAPACITY);
        let repo = Arc::clone(&self.repo);
        let completion = tokio::spawn(
            async move {
                let _guard = guard;
                let (reply, end) = pump(events, &tx, idle_timeout).await;
                drop(tx);
                commit(repo.as_ref(), session_id, reply, end, title).await
            }
            .instrument(span),
        );

        ChatTurn {
            reply: ReceiverStream::new(rx),
            completion,
        }
    }
}

/// Outcome of waiting for the next provider event.
enum Next {
    Event(Option<Result<StreamEvent, LlmError>>),
    TimedOut(Duration),
}

async fn next_event(events: &mut CompletionStream, idle_timeout: Option<Duration>) -> Next {
    match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, events.next()).await {
            Ok(event) => Next::Event(event),
            Err(_) => Next::TimedOut(limit),
        },
        None => Next::Event(events.next().await),
    }
}

/// Forward deltas to `tx` until the stream ends, fails, times out or the
/// receiver goes away. Returns exactly the text that was forwarded.
async fn pump(
    mut events: CompletionStream,
    tx: &mpsc::Sender<String>,
    idle_timeout: Option<Duration>,
) -> (String, StreamEnd) {
    let mut reply = String::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => return (reply, StreamEnd::Cancelled),
            next = next_event(&mut events, idle_timeout) => next,
        };

        let err = match next {
            Next::Event(Some(Ok(StreamEvent::TextDelta { text }))) => {
                if text.is_empty() {
                    continue;
                }
                if tx.send(text.clone()).await.is_err() {
                    return (reply, StreamEnd::Cancelled);
                }
                reply.push_str(&text);
                continue;
            }
            Next::Event(Some(Ok(StreamEvent::Connected))) => {
                debug!("Provider stream connected");
                continue;
            }
            Next::Event(Some(Ok(StreamEvent::Done))) | Next::Event(None) => {
                return (reply, StreamEnd::Completed);
            }
            Next::Event(Some(Err(e))) => ChatError::from(e),
            Next::TimedOut(limit) => ChatError::ProviderTimeout(limit.as_secs()),
        };

        warn!(error = %err, partial_chars = reply.chars().count(), "Provider stream failed");
        // The receiver may already be gone; the notice is best effort.
        let _ = tx.send(format!("{PROVIDER_ERROR_PREFIX}{}", notice_text(&err))).await;
        return (reply, StreamEnd::Failed(err));
    }
}

/// Error text shown to the caller, without the `ChatError` category prefix.
fn notice_text(err: &ChatError) -> String {
    match err {
        ChatError::Provider(message) => message.clone(),
        other => other.to_string(),
    }
}

async fn commit<R: ChatRepository>(
    repo: &R,
    session_id: Uuid,
    reply: String,
    end: StreamEnd,
    title: Option<String>,
) -> Result<TurnOutcome, ChatError> {
    let message_id = match repo
        .append_message(&session_id, MessageRole::Assistant, &reply)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to commit assistant reply");
            return Err(e.into());
        }
    };

    if let Some(title) = title {
        if let Err(e) = repo.rename_session(&session_id, &title).await {
            warn!(session_id = %session_id, error = %e, "Failed to set session title");
        }
    }

    info!(
        message_id,
        reply_chars = reply.chars().count(),
        end = end.as_str(),
        "Committed assistant reply"
    );
    Ok(TurnOutcome {
        message_id,
        reply,
        end,
    })
}
