//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `chatrelay-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, reads on the reader
//! pool and every mutation on the single writer connection. Operations that
//! touch more than one row run in one transaction.

use chatrelay_core::chat::repository::ChatRepository;
use chatrelay_types::chat::{ChatMessage, ChatSession, MessageId, MessageRole, summary_content};
use chatrelay_types::error::RepositoryError;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteConnection;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRepository`.
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain ChatSession.
struct ChatSessionRow {
    id: String,
    title: String,
    icon: String,
    assistant_name: Option<String>,
    created_at: String,
}

impl ChatSessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            icon: row.try_get("icon")?,
            assistant_name: row.try_get("assistant_name")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;

        Ok(ChatSession {
            id,
            title: self.title,
            icon: self.icon,
            assistant_name: self.assistant_name,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

/// Internal row type for mapping SQLite rows to domain ChatMessage.
struct ChatMessageRow {
    id: i64,
    session_id: String,
    sequence: i64,
    role: String,
    content: String,
    created_at: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            sequence: row.try_get("sequence")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?;
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ChatMessage {
            id: self.id,
            session_id,
            role,
            content: self.content,
            sequence: self.sequence,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so `ORDER BY created_at` sorts chronologically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

/// Insert a message with the session's next sequence number.
///
/// Must run inside a writer transaction so the sequence read and the insert
/// are not interleaved with another append.
async fn insert_next(
    conn: &mut SqliteConnection,
    session_id: &Uuid,
    role: MessageRole,
    content: &str,
) -> Result<MessageId, RepositoryError> {
    let (sequence,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(MAX(sequence), 0) + 1 FROM chat_messages WHERE session_id = ?",
    )
    .bind(session_id.to_string())
    .fetch_one(&mut *conn)
    .await
    .map_err(query_err)?;

    let result = sqlx::query(
        "INSERT INTO chat_messages (session_id, sequence, role, content, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(session_id.to_string())
    .bind(sequence)
    .bind(role.as_str())
    .bind(content)
    .bind(format_datetime(&Utc::now()))
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.message().contains("UNIQUE") {
                return RepositoryError::Conflict(format!(
                    "sequence {sequence} already exists for session {session_id}"
                ));
            }
        }
        query_err(e)
    })?;

    Ok(result.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn create_session(
        &self,
        session: &ChatSession,
        system_prompt: &str,
    ) -> Result<ChatSession, RepositoryError> {
        // Session row and system message land together or not at all
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query(
            "INSERT INTO chat_sessions (id, title, icon, assistant_name, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(&session.title)
        .bind(&session.icon)
        .bind(&session.assistant_name)
        .bind(format_datetime(&session.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("UNIQUE") {
                    return RepositoryError::Conflict(format!(
                        "session {} already exists",
                        session.id
                    ));
                }
            }
            query_err(e)
        })?;

        insert_next(&mut tx, &session.id, MessageRole::System, system_prompt).await?;

        tx.commit().await.map_err(query_err)?;

        Ok(session.clone())
    }

    async fn get_session(
        &self,
        session_id: &Uuid,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => {
                let session_row = ChatSessionRow::from_row(&row).map_err(query_err)?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM chat_sessions ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_row = ChatSessionRow::from_row(row).map_err(query_err)?;
            sessions.push(session_row.into_session()?);
        }

        Ok(sessions)
    }

    async fn rename_session(&self, session_id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE chat_sessions SET title = ? WHERE id = ?")
            .bind(title)
            .bind(session_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_session(&self, session_id: &Uuid) -> Result<(), RepositoryError> {
        // Messages go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = ?")
            .bind(session_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<MessageId, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM chat_sessions WHERE id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_err)?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let id = insert_next(&mut tx, session_id, role, content).await?;

        tx.commit().await.map_err(query_err)?;

        Ok(id)
    }

    async fn list_messages(&self, session_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, session_id, sequence, role, content, created_at
             FROM chat_messages WHERE session_id = ?
             ORDER BY sequence ASC, id ASC",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row = ChatMessageRow::from_row(row).map_err(query_err)?;
            messages.push(message_row.into_message()?);
        }

        Ok(messages)
    }

    async fn delete_last_of_role(
        &self,
        session_id: &Uuid,
        role: MessageRole,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM chat_messages WHERE id = (
                 SELECT id FROM chat_messages
                 WHERE session_id = ? AND role = ?
                 ORDER BY sequence DESC, id DESC
                 LIMIT 1
             )",
        )
        .bind(session_id.to_string())
        .bind(role.as_str())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_with_summary(
        &self,
        session_id: &Uuid,
        system_content: &str,
        summary: &str,
        pending_user: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let updated = sqlx::query(
            "UPDATE chat_messages SET content = ? WHERE session_id = ? AND role = 'system'",
        )
        .bind(system_content)
        .bind(session_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM chat_messages WHERE session_id = ? AND role != 'system'")
            .bind(session_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        insert_next(
            &mut tx,
            session_id,
            MessageRole::Assistant,
            &summary_content(summary),
        )
        .await?;
        if let Some(text) = pending_user {
            insert_next(&mut tx, session_id, MessageRole::User, text).await?;
        }

        tx.commit().await.map_err(query_err)?;

        Ok(())
    }
}
