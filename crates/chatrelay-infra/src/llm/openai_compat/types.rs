//! Wire types for the OpenAI chat-completions API.
//!
//! Only the fields the relay reads are modelled; everything else in a
//! response is ignored.

use chatrelay_types::llm::{CompletionRequest, Message};
use serde::{Deserialize, Serialize};

/// Request body for `POST {provider_url}`.
///
/// `model` and `max_tokens` are left out when unset; LM Studio and most
/// local servers then fall back to the loaded model and no output limit.
#[derive(Debug, Serialize)]
pub struct ChatCompletionBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

impl ChatCompletionBody {
    pub fn from_request(request: &CompletionRequest, stream: bool) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.messages.clone(),
            max_tokens: request.max_tokens,
            stream,
        }
    }
}

/// Non-streaming response.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// One `data:` payload of a streaming response.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}
