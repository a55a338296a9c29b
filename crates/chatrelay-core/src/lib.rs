//! Business logic and repository traits for chatrelay.
//!
//! Defines the storage and provider ports (`ChatRepository`,
//! `SettingsRepository`, `LlmProvider`, `ProviderFactory`) and the logic
//! built on them: context sizing, summarization, the completion relay and
//! session lifecycle management.

pub mod chat;
pub mod llm;
pub mod settings;
