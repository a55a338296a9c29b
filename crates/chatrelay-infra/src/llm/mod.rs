//! LLM provider implementations.
//!
//! Contains the OpenAI-compatible provider and [`OpenAiCompatFactory`],
//! which builds one from the current [`ChatSettings`] on every turn.

pub mod openai_compat;

use std::time::Duration;

use secrecy::SecretString;

use chatrelay_core::llm::box_provider::BoxLlmProvider;
use chatrelay_core::llm::provider::ProviderFactory;
use chatrelay_types::config::ChatSettings;
use chatrelay_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds [`OpenAiCompatibleProvider`]s that share one HTTP connection pool.
///
/// The client has a connect timeout but no overall request timeout: a
/// streamed reply may legitimately run for minutes, and stalls are caught
/// per chunk by the relay's idle timeout instead.
#[derive(Clone)]
pub struct OpenAiCompatFactory {
    client: reqwest::Client,
}

impl OpenAiCompatFactory {
    pub fn new() -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl ProviderFactory for OpenAiCompatFactory {
    fn create(&self, settings: &ChatSettings) -> Result<BoxLlmProvider, LlmError> {
        let url = settings
            .provider_url()
            .ok_or_else(|| LlmError::InvalidRequest("provider_url is not configured".to_string()))?;
        reqwest::Url::parse(url)
            .map_err(|e| LlmError::InvalidRequest(format!("invalid provider_url '{url}': {e}")))?;

        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| SecretString::from(key.to_string()));

        tracing::debug!(endpoint = url, authenticated = api_key.is_some(), "Creating provider");
        let provider = OpenAiCompatibleProvider::new(self.client.clone(), url.to_string(), api_key);
        Ok(BoxLlmProvider::new(provider))
    }
}
