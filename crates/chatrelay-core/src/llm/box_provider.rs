//! Type-erased handle over any [`LlmProvider`].
//!
//! `LlmProvider::complete` returns an opaque future, so the trait cannot be
//! named as `dyn LlmProvider`. The factory hands the relay a
//! [`BoxLlmProvider`] instead; it forwards to a private object-safe mirror
//! of the trait that every provider gets for free.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use chatrelay_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::provider::{CompletionStream, LlmProvider};

trait ErasedProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    fn complete_erased<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<CompletionResponse, LlmError>>;

    fn stream_erased(&self, request: CompletionRequest) -> CompletionStream;
}

impl<P: LlmProvider> ErasedProvider for P {
    fn provider_name(&self) -> &str {
        self.name()
    }

    fn complete_erased<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<CompletionResponse, LlmError>> {
        self.complete(request).boxed()
    }

    fn stream_erased(&self, request: CompletionRequest) -> CompletionStream {
        LlmProvider::stream(self, request)
    }
}

/// Provider chosen for one turn, built by a
/// [`ProviderFactory`](super::provider::ProviderFactory).
pub struct BoxLlmProvider(Box<dyn ErasedProvider>);

impl BoxLlmProvider {
    pub fn new<P: LlmProvider + 'static>(provider: P) -> Self {
        Self(Box::new(provider))
    }

    pub fn name(&self) -> &str {
        self.0.provider_name()
    }

    /// Non-streaming completion, used for summaries.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        self.0.complete_erased(request).await
    }

    /// Streaming completion. The returned stream does not borrow the provider.
    pub fn stream(&self, request: CompletionRequest) -> CompletionStream {
        self.0.stream_erased(request)
    }
}

impl std::fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxLlmProvider").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use chatrelay_types::llm::StreamEvent;

    use super::*;
    use crate::chat::testing::{ScriptedProvider, Step};

    fn request(stream: bool) -> CompletionRequest {
        CompletionRequest {
            model: Some("test-model".to_string()),
            messages: vec![],
            max_tokens: None,
            stream,
        }
    }

    #[tokio::test]
    async fn test_forwards_to_wrapped_provider() {
        let inner = ScriptedProvider::new(vec![Step::Delta("hi"), Step::Done]).with_summary("short");
        let boxed = BoxLlmProvider::new(inner.clone());

        assert_eq!(boxed.name(), "scripted");
        assert_eq!(format!("{boxed:?}"), "BoxLlmProvider(\"scripted\")");

        let response = boxed.complete(&request(false)).await.unwrap();
        assert_eq!(response.content, "short");

        let events: Vec<_> = boxed.stream(request(true)).collect().await;
        assert!(matches!(&events[0], Ok(StreamEvent::TextDelta { text }) if text == "hi"));
        assert!(matches!(events[1], Ok(StreamEvent::Done)));
        assert_eq!(inner.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_stream_outlives_handle() {
        let boxed = BoxLlmProvider::new(ScriptedProvider::new(vec![Step::Delta("a")]));
        let stream = boxed.stream(request(true));
        drop(boxed);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
    }
}
