//! Configuration and runtime settings types for chatrelay.
//!
//! `AppConfig` is the top-level `config.toml` (server bind address plus the
//! defaults used to seed the settings store on first run). `ChatSettings`
//! is the runtime snapshot handed to every relay call.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chat::FALLBACK_SYSTEM_PROMPT;

/// Provider endpoint used until the operator configures another one.
pub const DEFAULT_PROVIDER_URL: &str = "http://localhost:1234/v1/chat/completions";

/// Context window assumed when nothing else is configured.
pub const DEFAULT_CONTEXT_TOKEN_LIMIT: u32 = 8000;

/// A named system prompt with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub title: String,
    pub prompt: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub assistant_name: Option<String>,
}

fn default_icon() -> String {
    crate::chat::DEFAULT_ICON.to_string()
}

/// The personas available on a fresh install.
pub fn default_personas() -> Vec<Persona> {
    vec![
        Persona {
            title: "Default Assistant".to_string(),
            prompt: "You are a helpful, general-purpose AI assistant.".to_string(),
            icon: "bot.svg".to_string(),
            assistant_name: Some("Assistant".to_string()),
        },
        Persona {
            title: "Python Expert".to_string(),
            prompt: "You are an expert Python developer. Provide clean, efficient, and \
                     well-commented code."
                .to_string(),
            icon: "python.svg".to_string(),
            assistant_name: Some("Python Coder".to_string()),
        },
        Persona {
            title: "Creative Storyteller".to_string(),
            prompt: "You are a master storyteller. Weave imaginative and engaging tales \
                     based on the user's input."
                .to_string(),
            icon: "story.svg".to_string(),
            assistant_name: Some("Storyteller".to_string()),
        },
    ]
}

/// Runtime settings, read as one snapshot per relay call.
///
/// Every field has a default so partial TOML or JSON documents fill in the
/// rest. The API key is accepted on input but never serialized outward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub provider_url: Option<String>,
    pub model: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Upper bound on generated tokens; negative means unbounded.
    pub max_output_tokens: i64,
    pub context_token_limit: u32,
    /// Pruning threshold; zero falls back to `context_token_limit`.
    pub summarization_threshold: u32,
    pub summarization_enabled: bool,
    /// Idle timeout between streamed chunks. `None` waits indefinitely.
    pub provider_timeout_secs: Option<u64>,
    pub personas: Vec<Persona>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            provider_url: Some(DEFAULT_PROVIDER_URL.to_string()),
            model: None,
            api_key: None,
            max_output_tokens: -1,
            context_token_limit: DEFAULT_CONTEXT_TOKEN_LIMIT,
            summarization_threshold: 0,
            summarization_enabled: true,
            provider_timeout_secs: None,
            personas: default_personas(),
        }
    }
}

impl ChatSettings {
    /// The configured provider endpoint, if any non-blank one is set.
    pub fn provider_url(&self) -> Option<&str> {
        self.provider_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// `max_tokens` for outbound requests; `None` when unbounded.
    pub fn max_tokens(&self) -> Option<u32> {
        u32::try_from(self.max_output_tokens)
            .ok()
            .filter(|tokens| *tokens > 0)
    }

    /// Token estimate above which history is summarized.
    pub fn pruning_threshold(&self) -> usize {
        if self.summarization_threshold > 0 {
            self.summarization_threshold as usize
        } else {
            self.context_token_limit as usize
        }
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// System prompt used when a session is created without one.
    pub fn default_prompt(&self) -> &str {
        self.personas
            .first()
            .map(|p| p.prompt.as_str())
            .unwrap_or(FALLBACK_SYSTEM_PROMPT)
    }

    /// The configured persona whose prompt text matches exactly.
    pub fn persona_for_prompt(&self, prompt: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.prompt == prompt)
    }
}

/// Address the HTTP server binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Top-level configuration loaded from `{data_dir}/config.toml`.
///
/// All fields have defaults; a missing file yields `AppConfig::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Settings written to the store the first time it is opened.
    pub defaults: ChatSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_local_provider() {
        let settings = ChatSettings::default();
        assert_eq!(settings.provider_url(), Some(DEFAULT_PROVIDER_URL));
        assert_eq!(settings.max_tokens(), None);
        assert_eq!(settings.pruning_threshold(), 8000);
        assert_eq!(settings.personas.len(), 3);
        assert_eq!(settings.personas[1].icon, "python.svg");
    }

    #[test]
    fn blank_provider_url_counts_as_missing() {
        let settings = ChatSettings {
            provider_url: Some("   ".to_string()),
            ..ChatSettings::default()
        };
        assert_eq!(settings.provider_url(), None);
    }

    #[test]
    fn summarization_threshold_overrides_context_limit() {
        let settings = ChatSettings {
            summarization_threshold: 1200,
            ..ChatSettings::default()
        };
        assert_eq!(settings.pruning_threshold(), 1200);
    }

    #[test]
    fn positive_max_output_tokens_are_sent() {
        let settings = ChatSettings {
            max_output_tokens: 512,
            ..ChatSettings::default()
        };
        assert_eq!(settings.max_tokens(), Some(512));
    }

    #[test]
    fn default_prompt_falls_back_without_personas() {
        let settings = ChatSettings {
            personas: Vec::new(),
            ..ChatSettings::default()
        };
        assert_eq!(settings.default_prompt(), FALLBACK_SYSTEM_PROMPT);
        assert!(settings.persona_for_prompt(FALLBACK_SYSTEM_PROMPT).is_none());
    }

    #[test]
    fn api_key_is_never_serialized() {
        let settings = ChatSettings {
            api_key: Some("sk-test".to_string()),
            ..ChatSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("sk-test"));
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9090

            [defaults]
            context_token_limit = 4096
            summarization_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.defaults.context_token_limit, 4096);
        assert!(!config.defaults.summarization_enabled);
        assert_eq!(config.defaults.personas.len(), 3);
    }
}
