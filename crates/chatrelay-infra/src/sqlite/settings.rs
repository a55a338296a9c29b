//! SQLite settings repository implementation.
//!
//! Scalar settings live in the `settings` key/value table with values stored
//! as JSON text; personas live in their own table, ordered by `position`.
//! Loading rebuilds a JSON object from the rows and lets serde fill in
//! defaults for keys that were never written.

use std::collections::HashMap;

use chatrelay_core::settings::SettingsRepository;
use chatrelay_types::config::{ChatSettings, Persona};
use chatrelay_types::error::RepositoryError;
use serde_json::{Map, Value};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SettingsRepository`.
pub struct SqliteSettingsRepository {
    pool: DatabasePool,
}

impl SqliteSettingsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct PersonaRow {
    title: String,
    prompt: String,
    icon: String,
    assistant_name: Option<String>,
}

impl PersonaRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            title: row.try_get("title")?,
            prompt: row.try_get("prompt")?,
            icon: row.try_get("icon")?,
            assistant_name: row.try_get("assistant_name")?,
        })
    }

    fn into_persona(self) -> Persona {
        Persona {
            title: self.title,
            prompt: self.prompt,
            icon: self.icon,
            assistant_name: self.assistant_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

/// Scalar settings as `(key, JSON text)` pairs, personas excluded.
///
/// The API key is skipped by `Serialize`, so it is added explicitly.
fn settings_to_entries(settings: &ChatSettings) -> Result<Vec<(String, String)>, RepositoryError> {
    let Value::Object(mut map) = serde_json::to_value(settings)
        .map_err(|e| RepositoryError::Query(format!("failed to encode settings: {e}")))?
    else {
        return Err(RepositoryError::Query(
            "settings did not encode to an object".to_string(),
        ));
    };
    map.remove("personas");
    map.insert(
        "api_key".to_string(),
        settings.api_key.clone().map(Value::String).unwrap_or(Value::Null),
    );

    Ok(map
        .into_iter()
        .map(|(key, value)| (key, value.to_string()))
        .collect())
}

/// Rebuild settings from stored rows. Missing keys take their defaults.
fn settings_from_entries(
    entries: HashMap<String, String>,
    personas: Vec<Persona>,
) -> Result<ChatSettings, RepositoryError> {
    let mut map = Map::new();
    for (key, raw) in entries {
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| RepositoryError::Query(format!("invalid JSON for setting '{key}': {e}")))?;
        map.insert(key, value);
    }
    let personas = serde_json::to_value(personas)
        .map_err(|e| RepositoryError::Query(format!("failed to encode personas: {e}")))?;
    map.insert("personas".to_string(), personas);

    serde_json::from_value(Value::Object(map))
        .map_err(|e| RepositoryError::Query(format!("invalid stored settings: {e}")))
}

// ---------------------------------------------------------------------------
// SettingsRepository implementation
// ---------------------------------------------------------------------------

impl SettingsRepository for SqliteSettingsRepository {
    async fn load(&self) -> Result<ChatSettings, RepositoryError> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;
        let mut entries = HashMap::with_capacity(rows.len());
        for row in &rows {
            let key: String = row.try_get("key").map_err(query_err)?;
            let value: String = row.try_get("value").map_err(query_err)?;
            entries.insert(key, value);
        }

        let persona_rows = sqlx::query(
            "SELECT title, prompt, icon, assistant_name FROM personas ORDER BY position ASC, id ASC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;
        let mut personas = Vec::with_capacity(persona_rows.len());
        for row in &persona_rows {
            personas.push(PersonaRow::from_row(row).map_err(query_err)?.into_persona());
        }

        settings_from_entries(entries, personas)
    }

    async fn save(&self, settings: &ChatSettings) -> Result<(), RepositoryError> {
        let entries = settings_to_entries(settings)?;

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query("DELETE FROM settings")
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        for (key, value) in &entries {
            sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
        }

        sqlx::query("DELETE FROM personas")
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        for (position, persona) in settings.personas.iter().enumerate() {
            sqlx::query(
                "INSERT INTO personas (position, title, prompt, icon, assistant_name)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(position as i64)
            .bind(&persona.title)
            .bind(&persona.prompt)
            .bind(&persona.icon)
            .bind(&persona.assistant_name)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        tx.commit().await.map_err(query_err)?;

        tracing::debug!(personas = settings.personas.len(), "Settings saved");
        Ok(())
    }

    async fn seed_defaults(&self, defaults: &ChatSettings) -> Result<bool, RepositoryError> {
        let (stored,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(&self.pool.writer)
            .await
            .map_err(query_err)?;
        if stored > 0 {
            return Ok(false);
        }

        self.save(defaults).await?;
        tracing::info!("Seeded settings store with defaults");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::{DatabasePool, database_url};

    async fn test_repo() -> SqliteSettingsRepository {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(dir.path());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        SqliteSettingsRepository::new(DatabasePool::new(&url).await.unwrap())
    }

    #[tokio::test]
    async fn test_empty_store_loads_defaults_without_personas() {
        let repo = test_repo().await;

        let settings = repo.load().await.unwrap();

        assert_eq!(settings.context_token_limit, 8000);
        assert_eq!(settings.max_output_tokens, -1);
        assert!(settings.personas.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips_everything() {
        let repo = test_repo().await;
        let settings = ChatSettings {
            provider_url: Some("http://llm.internal/v1/chat/completions".to_string()),
            model: Some("qwen2.5-7b".to_string()),
            api_key: Some("sk-local".to_string()),
            max_output_tokens: 2048,
            context_token_limit: 4096,
            summarization_threshold: 3000,
            summarization_enabled: false,
            provider_timeout_secs: Some(30),
            ..ChatSettings::default()
        };

        repo.save(&settings).await.unwrap();

        assert_eq!(repo.load().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_save_replaces_personas_wholesale() {
        let repo = test_repo().await;
        repo.save(&ChatSettings::default()).await.unwrap();

        let only = Persona {
            title: "Terse".to_string(),
            prompt: "Answer in one sentence.".to_string(),
            icon: "bot.svg".to_string(),
            assistant_name: None,
        };
        let settings = ChatSettings {
            personas: vec![only.clone()],
            ..ChatSettings::default()
        };
        repo.save(&settings).await.unwrap();

        assert_eq!(repo.load().await.unwrap().personas, vec![only]);
    }

    #[tokio::test]
    async fn test_cleared_provider_url_stays_cleared() {
        let repo = test_repo().await;
        let settings = ChatSettings {
            provider_url: None,
            ..ChatSettings::default()
        };

        repo.save(&settings).await.unwrap();

        assert_eq!(repo.load().await.unwrap().provider_url, None);
    }

    #[tokio::test]
    async fn test_seed_defaults_only_once() {
        let repo = test_repo().await;

        assert!(repo.seed_defaults(&ChatSettings::default()).await.unwrap());
        let changed = ChatSettings {
            context_token_limit: 1,
            ..ChatSettings::default()
        };
        assert!(!repo.seed_defaults(&changed).await.unwrap());

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded.context_token_limit, 8000);
        assert_eq!(loaded.personas.len(), 3);
    }
}
