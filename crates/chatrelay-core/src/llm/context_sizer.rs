//! Cheap token estimation for conversation histories.
//!
//! Counts words rather than real tokens: a maximal run of alphanumeric or
//! underscore characters is one token. Good enough to decide when history
//! has to be summarized, without loading a tokenizer.

use chatrelay_types::config::ChatSettings;
use chatrelay_types::llm::Message;

/// Estimates the size of a message list and decides when to prune it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextSizer;

impl ContextSizer {
    /// Estimated token cost of all message contents.
    pub fn estimate(messages: &[Message]) -> usize {
        messages.iter().map(|m| count_words(&m.content)).sum()
    }

    /// Whether the estimate exceeds `threshold`.
    pub fn needs_pruning(messages: &[Message], threshold: usize) -> bool {
        Self::estimate(messages) > threshold
    }

    /// The threshold the relay prunes against for these settings.
    pub fn pruning_threshold(settings: &ChatSettings) -> usize {
        settings.pruning_threshold()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Number of maximal word-character runs in `text`.
fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for c in text.chars() {
        let word = is_word_char(c);
        if word && !in_word {
            count += 1;
        }
        in_word = word;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(content: &str) -> Message {
        Message::user(content)
    }

    #[test]
    fn test_estimate_counts_word_runs() {
        let messages = [user("hello world"), user("foo-bar baz")];
        assert_eq!(ContextSizer::estimate(&messages), 5);
    }

    #[test]
    fn test_needs_pruning_is_strictly_greater() {
        let messages = [user("hello world"), user("foo-bar baz")];
        assert!(ContextSizer::needs_pruning(&messages, 4));
        assert!(!ContextSizer::needs_pruning(&messages, 5));
    }

    #[test]
    fn test_estimate_empty_and_punctuation() {
        assert_eq!(ContextSizer::estimate(&[]), 0);
        assert_eq!(ContextSizer::estimate(&[user("... !!! ---")]), 0);
        assert_eq!(ContextSizer::estimate(&[user("snake_case_name")]), 1);
    }

    #[test]
    fn test_estimate_handles_unicode_words() {
        assert_eq!(ContextSizer::estimate(&[user("héllo wörld, naïve café")]), 4);
    }

    #[test]
    fn test_pruning_threshold_uses_settings() {
        let settings = ChatSettings {
            context_token_limit: 2000,
            summarization_threshold: 0,
            ..ChatSettings::default()
        };
        assert_eq!(ContextSizer::pruning_threshold(&settings), 2000);
    }
}
