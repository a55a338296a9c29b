//! Infrastructure layer for chatrelay.
//!
//! Contains implementations of the ports defined in `chatrelay-core`:
//! SQLite storage for sessions, messages and settings, the
//! OpenAI-compatible streaming provider, and the `config.toml` loader.

pub mod config;
pub mod llm;
pub mod sqlite;
