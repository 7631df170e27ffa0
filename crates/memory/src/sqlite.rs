//! SQLite message store.
//!
//! Three tables:
//! - `sessions` records each wake cycle and the resource it belongs to
//! - `messages` holds session messages with an optional embedding blob
//! - `working_memory` holds operator notes per session

use crate::message_store::{MessageStore, StoredMessage};
use async_trait::async_trait;
use automaton_core::error::MemoryError;
use automaton_core::message::Role;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    /// Open (or create) the store at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!(path = %path, "SQLite message store initialized");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        let statements = [
            (
                "sessions table",
                r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    id          TEXT PRIMARY KEY,
                    resource_id TEXT NOT NULL,
                    title       TEXT NOT NULL,
                    created_at  TEXT NOT NULL
                )
                "#,
            ),
            (
                "messages table",
                r#"
                CREATE TABLE IF NOT EXISTS messages (
                    iid         INTEGER PRIMARY KEY AUTOINCREMENT,
                    id          TEXT UNIQUE NOT NULL,
                    session_id  TEXT NOT NULL,
                    resource_id TEXT NOT NULL,
                    role        TEXT NOT NULL,
                    content     TEXT NOT NULL,
                    created_at  TEXT NOT NULL,
                    embedding   BLOB
                )
                "#,
            ),
            (
                "working_memory table",
                r#"
                CREATE TABLE IF NOT EXISTS working_memory (
                    session_id TEXT PRIMARY KEY,
                    content    TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "session index",
                "CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, iid)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| MemoryError::Storage(format!("Migration failed ({what}): {e}")))?;
        }

        debug!("Message store migrations complete");
        Ok(())
    }

    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn parse_role(raw: &str) -> Role {
        match raw {
            "user" => Role::User,
            "system" => Role::System,
            "tool" => Role::Tool,
            _ => Role::Assistant,
        }
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    fn row_to_message(row: &SqliteRow) -> Result<StoredMessage, MemoryError> {
        let get = |name: &str| -> Result<String, MemoryError> {
            row.try_get(name)
                .map_err(|e| MemoryError::QueryFailed(format!("{name} column: {e}")))
        };
        let created_at = chrono::DateTime::parse_from_rfc3339(&get("created_at")?)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let embedding: Option<Vec<u8>> = row.try_get("embedding").ok().flatten();

        Ok(StoredMessage {
            id: get("id")?,
            session_id: get("session_id")?,
            resource_id: get("resource_id")?,
            role: Self::parse_role(&get("role")?),
            content: get("content")?,
            created_at,
            embedding: embedding.as_deref().map(Self::blob_to_embedding),
        })
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_session(&self, session_id: &str, resource_id: &str) -> Result<(), MemoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO sessions (id, resource_id, title, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(session_id)
        .bind(resource_id)
        .bind(format!("Wake cycle {now}"))
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("session insert: {e}")))?;
        Ok(())
    }

    async fn append(&self, messages: Vec<StoredMessage>) -> Result<(), MemoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MemoryError::Storage(format!("begin: {e}")))?;

        for msg in &messages {
            let blob = msg.embedding.as_deref().map(Self::embedding_to_blob);
            sqlx::query(
                r#"
                INSERT INTO messages (id, session_id, resource_id, role, content, created_at, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    content = excluded.content,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&msg.id)
            .bind(&msg.session_id)
            .bind(&msg.resource_id)
            .bind(Self::role_str(msg.role))
            .bind(&msg.content)
            .bind(msg.created_at.to_rfc3339())
            .bind(blob.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(|e| MemoryError::Storage(format!("message insert: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| MemoryError::Storage(format!("commit: {e}")))?;
        debug!(count = messages.len(), "Stored session messages");
        Ok(())
    }

    async fn last_messages(&self, session_id: &str, limit: usize) -> Result<Vec<StoredMessage>, MemoryError> {
        let rows = sqlx::query("SELECT * FROM messages WHERE session_id = ?1 ORDER BY iid DESC LIMIT ?2")
            .bind(session_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("last messages: {e}")))?;

        let mut messages = rows
            .iter()
            .map(Self::row_to_message)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn all_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, MemoryError> {
        let rows = sqlx::query("SELECT * FROM messages WHERE session_id = ?1 ORDER BY iid ASC")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("session messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn working_memory(&self, session_id: &str) -> Result<Option<String>, MemoryError> {
        let row = sqlx::query("SELECT content FROM working_memory WHERE session_id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("working memory: {e}")))?;

        row.map(|r| {
            r.try_get::<String, _>("content")
                .map_err(|e| MemoryError::QueryFailed(format!("content column: {e}")))
        })
        .transpose()
    }

    async fn set_working_memory(&self, session_id: &str, content: &str) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            INSERT INTO working_memory (session_id, content, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(content)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("working memory update: {e}")))?;
        Ok(())
    }
}
