//! SettingsRepository trait definition.

use chatrelay_types::config::ChatSettings;
use chatrelay_types::error::RepositoryError;

/// Persistent store for the runtime relay settings and personas.
///
/// Implementations live in chatrelay-infra (e.g., `SqliteSettingsRepository`).
pub trait SettingsRepository: Send + Sync {
    /// Current settings. Keys that were never stored take their defaults.
    fn load(&self) -> impl std::future::Future<Output = Result<ChatSettings, RepositoryError>> + Send;

    /// Replace the stored settings and personas wholesale.
    fn save(
        &self,
        settings: &ChatSettings,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Store `defaults` if nothing has been stored yet.
    ///
    /// Returns whether the defaults were written.
    fn seed_defaults(
        &self,
        defaults: &ChatSettings,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
