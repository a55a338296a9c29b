//! Context summarizer for over-grown histories.
//!
//! `ContextSummarizer` condenses a conversation into a short digest with a
//! non-streaming call to the same provider that serves the turn. The relay
//! swaps the digest in for the summarized messages.

use chatrelay_types::llm::{CompletionRequest, LlmError, Message, MessageRole};

use crate::llm::box_provider::BoxLlmProvider;

/// Instruction sent as the system message of the summarization call.
const SUMMARY_SYSTEM_PROMPT: &str = "Summarize the following conversation concisely. \
Preserve key facts, decisions, the user's current goals and any unresolved questions. \
Write in third person (\"The user asked...\", \"The assistant explained...\").";

/// Stateless utility for summarizing conversation context.
pub struct ContextSummarizer;

impl ContextSummarizer {
    /// Summarize `messages` into a concise digest.
    ///
    /// System messages are left out of the transcript; the relay keeps the
    /// original system prompt alongside the digest. Returns an empty string
    /// when there is nothing to summarize.
    #[tracing::instrument(
        name = "summarize_context",
        skip(provider, messages, model),
        fields(provider = provider.name(), message_count = messages.len())
    )]
    pub async fn summarize(
        provider: &BoxLlmProvider,
        messages: &[Message],
        max_tokens: Option<u32>,
        model: Option<&str>,
    ) -> Result<String, LlmError> {
        let transcript = format_transcript(messages);
        if transcript.is_empty() {
            return Ok(String::new());
        }

        let request = CompletionRequest {
            model: model.map(str::to_string),
            messages: vec![
                Message::system(SUMMARY_SYSTEM_PROMPT),
                Message::user(format!(
                    "Please summarize this conversation:\n\n<conversation>\n{transcript}\n</conversation>"
                )),
            ],
            max_tokens,
            stream: false,
        };

        let response = provider.complete(&request).await?;
        Ok(response.content.trim().to_string())
    }
}

/// `role: content` blocks for every non-system message.
fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::ScriptedProvider;

    #[test]
    fn test_transcript_skips_system_messages() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("What is 2+2?"),
            Message::assistant("4"),
        ];
        assert_eq!(
            format_transcript(&messages),
            "user: What is 2+2?\n\nassistant: 4"
        );
    }

    #[tokio::test]
    async fn test_summarize_empty_history_skips_provider() {
        let provider = ScriptedProvider::new(Vec::new()).with_summary("unused");
        let boxed = BoxLlmProvider::new(provider.clone());

        let summary =
            ContextSummarizer::summarize(&boxed, &[Message::system("sys")], Some(1024), None)
                .await
                .unwrap();

        assert!(summary.is_empty());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_sends_non_streaming_request() {
        let provider = ScriptedProvider::new(Vec::new()).with_summary("  The user asked about math.  ");
        let boxed = BoxLlmProvider::new(provider.clone());

        let summary = ContextSummarizer::summarize(
            &boxed,
            &[Message::user("What is 2+2?"), Message::assistant("4")],
            Some(1024),
            Some("local-model"),
        )
        .await
        .unwrap();

        assert_eq!(summary, "The user asked about math.");
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].stream);
        assert_eq!(requests[0].model.as_deref(), Some("local-model"));
        assert_eq!(requests[0].messages[0].role, MessageRole::System);
        assert!(requests[0].messages[1].content.contains("user: What is 2+2?"));
    }
}
