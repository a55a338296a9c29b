//! Shared domain types for chatrelay.
//!
//! Sessions, persisted messages, relay settings and personas, the wire
//! shapes exchanged with chat-completion providers, and the error types
//! shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
