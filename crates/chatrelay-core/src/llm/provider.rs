//! LlmProvider and ProviderFactory trait definitions.
//!
//! Uses RPITIT for `complete` and `Pin<Box<dyn Stream>>` for `stream`
//! (streams need to be object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use chatrelay_types::config::ChatSettings;
use chatrelay_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

use super::box_provider::BoxLlmProvider;

/// Stream of events produced by a streaming completion.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for chat-completion backends.
///
/// Implementations live in chatrelay-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// The stream owns everything it needs, so it outlives `self`.
    fn stream(&self, request: CompletionRequest) -> CompletionStream;
}

/// Builds a provider for one settings snapshot.
///
/// The relay asks for a fresh provider on every turn so endpoint, model
/// and key changes apply to the next turn without a restart.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, settings: &ChatSettings) -> Result<BoxLlmProvider, LlmError>;
}
