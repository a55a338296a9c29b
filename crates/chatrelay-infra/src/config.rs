//! Data directory and `config.toml` loading.
//!
//! `config.toml` holds the server bind address and the settings seeded into
//! the store on first start. Falls back to defaults when the file is
//! missing or malformed.

use std::path::{Path, PathBuf};

use chatrelay_types::config::AppConfig;

pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the data directory.
///
/// Priority:
/// 1. `CHATRELAY_DATA_DIR` environment variable
/// 2. `~/.chatrelay`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHATRELAY_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".chatrelay");
    }

    PathBuf::from(".chatrelay")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`AppConfig::default()`].
/// - Unreadable or unparseable file: logs a warning, returns the default.
pub async fn load_app_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();

        let config = load_app_config(tmp.path()).await;

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 8000);
    }

    #[tokio::test]
    async fn test_valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[server]
port = 9100

[defaults]
provider_url = "http://gpu-box:8080/v1/chat/completions"
model = "llama-3.1-8b"
provider_timeout_secs = 45
"#,
        )
        .await
        .unwrap();

        let config = load_app_config(tmp.path()).await;

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.defaults.provider_url(),
            Some("http://gpu-box:8080/v1/chat/completions")
        );
        assert_eq!(config.defaults.model.as_deref(), Some("llama-3.1-8b"));
        assert_eq!(config.defaults.provider_timeout_secs, Some(45));
        assert_eq!(config.defaults.context_token_limit, 8000);
        assert_eq!(config.defaults.personas.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_app_config(tmp.path()).await;

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is the only one touching CHATRELAY_DATA_DIR.
        unsafe {
            std::env::set_var("CHATRELAY_DATA_DIR", "/tmp/test-chatrelay");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-chatrelay"));
        unsafe {
            std::env::remove_var("CHATRELAY_DATA_DIR");
        }
    }
}
