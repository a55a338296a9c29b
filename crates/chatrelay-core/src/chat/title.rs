//! Session title derivation.
//!
//! A session keeps the default title until its first exchange; the title
//! then becomes the opening of the first user message.

use chatrelay_types::chat::TITLE_MAX_CHARS;

/// Title for a session whose first user message is `first_user_message`.
///
/// Keeps the first 40 characters and appends `"..."` when anything was cut.
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn title_from_first_message(first_user_message: &str) -> String {
    let mut chars = first_user_message.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
