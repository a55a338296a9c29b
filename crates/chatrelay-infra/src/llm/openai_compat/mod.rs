//! OpenAI-compatible chat-completions provider.
//!
//! Talks to any server exposing the OpenAI `chat/completions` wire format
//! (LM Studio, Ollama, vLLM, OpenAI itself) at a fully qualified endpoint
//! URL. Streaming goes through [`streaming::create_openai_stream`].

pub mod streaming;
pub mod types;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use chatrelay_core::llm::provider::{CompletionStream, LlmProvider};
use chatrelay_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use self::types::{ChatCompletionBody, ChatCompletionResponse};

/// Provider for one OpenAI-compatible endpoint.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl OpenAiCompatibleProvider {
    /// `endpoint` is the full completions URL, not a base URL.
    pub fn new(client: reqwest::Client, endpoint: String, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Map a non-success HTTP status to an [`LlmError`].
pub(crate) fn status_error(status: StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        400 | 404 | 422 => LlmError::InvalidRequest(format!("HTTP {status}: {body}")),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = ChatCompletionBody::from_request(request, false);

        let mut http = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key.expose_secret());
        }

        let response = http.send().await.map_err(|e| LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, "Provider error response");
            return Err(status_error(status, error_body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Deserialization("response has no message content".to_string()))?;

        Ok(CompletionResponse {
            id: parsed.id,
            content,
            model: parsed.model,
        })
    }

    fn stream(&self, request: CompletionRequest) -> CompletionStream {
        let body = ChatCompletionBody::from_request(&request, true);
        streaming::create_openai_stream(&self.client, &self.endpoint, body, self.api_key.as_ref())
    }
}
