//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over the repository trait; AppState pins them to the
//! SQLite implementations and shares one repository, one lock table and one
//! provider factory between them.

use std::path::PathBuf;
use std::sync::Arc;

use chatrelay_core::chat::relay::CompletionRelay;
use chatrelay_core::chat::service::SessionService;
use chatrelay_core::chat::session::SessionLocks;
use chatrelay_core::settings::SettingsRepository;
use chatrelay_infra::config::{load_app_config, resolve_data_dir};
use chatrelay_infra::llm::OpenAiCompatFactory;
use chatrelay_infra::sqlite::chat::SqliteChatRepository;
use chatrelay_infra::sqlite::pool::{DatabasePool, database_url};
use chatrelay_infra::sqlite::settings::SqliteSettingsRepository;
use chatrelay_types::config::{AppConfig, ChatSettings};
use chatrelay_types::error::RepositoryError;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteSessionService = SessionService<SqliteChatRepository>;

pub type ConcreteRelay = CompletionRelay<SqliteChatRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<ConcreteSessionService>,
    pub relay: Arc<ConcreteRelay>,
    pub settings_repo: Arc<SqliteSettingsRepository>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state in the resolved data directory.
    pub async fn init() -> anyhow::Result<Self> {
        Self::init_in(resolve_data_dir()).await
    }

    /// Connect to the database in `data_dir`, seed settings, wire services.
    pub async fn init_in(data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_app_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        let settings_repo = SqliteSettingsRepository::new(db_pool.clone());
        settings_repo.seed_defaults(&config.defaults).await?;

        let chat_repo = Arc::new(SqliteChatRepository::new(db_pool));
        let locks = SessionLocks::new();
        let providers = Arc::new(OpenAiCompatFactory::new()?);

        let session_service = SessionService::new(Arc::clone(&chat_repo), locks.clone());
        let relay = CompletionRelay::new(chat_repo, providers, locks);

        tracing::debug!(data_dir = %data_dir.display(), "Application state initialized");

        Ok(Self {
            session_service: Arc::new(session_service),
            relay: Arc::new(relay),
            settings_repo: Arc::new(settings_repo),
            config: Arc::new(config),
            data_dir,
        })
    }

    /// Current settings, read fresh from the store.
    ///
    /// Each relay call gets its own snapshot, so edits apply to the next turn.
    pub async fn settings_snapshot(&self) -> Result<ChatSettings, RepositoryError> {
        self.settings_repo.load().await
    }
}
