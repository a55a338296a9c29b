//! SQLite connection pools for the chat store.
//!
//! The store runs in WAL mode with one writer connection, so message
//! sequence numbers assigned inside a write transaction never race. Reads
//! go through a separate read-only pool and see the last committed state.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "chatrelay.db";

const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Reader and writer pools over the same database file.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    /// Single connection. Every INSERT, UPDATE and DELETE goes here.
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open the database at `database_url`, creating it when missing, and
    /// bring the schema up to date before any reader connects.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        MIGRATOR.run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        tracing::debug!(url = database_url, "Chat store opened");
        Ok(Self { reader, writer })
    }
}

/// `sqlite://` URL of the chat store inside `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    let file = data_dir.join(DATABASE_FILE);
    format!("sqlite://{}?mode=rwc", file.display())
}
