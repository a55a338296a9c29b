use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in chatrelay-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by session lifecycle and relay operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session not found")]
    NotFound,

    #[error("no assistant reply to regenerate")]
    NothingToRegenerate,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("provider sent nothing for {0}s")]
    ProviderTimeout(u64),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ChatError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ChatError::NotFound,
            other => ChatError::Storage(other.to_string()),
        }
    }
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        ChatError::Provider(err.to_string())
    }
}
