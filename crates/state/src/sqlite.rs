//! SQLite durable store.
//!
//! One database file with five tables:
//! - `kv` holds the agent state and loop flags (`sleep_until`, `start_time`)
//! - `identity` holds the automaton's identity fields
//! - `turns` is the append-only turn log, action results embedded as JSON
//! - `action_results` mirrors each result as its own row for inspection
//! - `inbox_messages` queues peer messages until the loop consumes them

use async_trait::async_trait;
use automaton_core::action::ActionResult;
use automaton_core::agent::{AgentState, Turn};
use automaton_core::error::StoreError;
use automaton_core::store::{AutomatonDatabase, InboxMessage};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (or create) the store at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every in-memory connection is its own database
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let db = Self { pool };
        db.run_migrations().await?;
        info!(path = %path, "State database initialized");
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements = [
            (
                "kv table",
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key        TEXT PRIMARY KEY,
                    value      TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "identity table",
                r#"
                CREATE TABLE IF NOT EXISTS identity (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )
                "#,
            ),
            (
                "turns table",
                r#"
                CREATE TABLE IF NOT EXISTS turns (
                    iid            INTEGER PRIMARY KEY AUTOINCREMENT,
                    id             TEXT UNIQUE NOT NULL,
                    timestamp      TEXT NOT NULL,
                    state          TEXT NOT NULL,
                    input          TEXT,
                    input_source   TEXT,
                    thinking       TEXT NOT NULL DEFAULT '',
                    action_results TEXT NOT NULL DEFAULT '[]',
                    token_usage    TEXT NOT NULL DEFAULT '{}',
                    cost_cents     INTEGER NOT NULL DEFAULT 0
                )
                "#,
            ),
            (
                "action_results table",
                r#"
                CREATE TABLE IF NOT EXISTS action_results (
                    iid         INTEGER PRIMARY KEY AUTOINCREMENT,
                    id          TEXT NOT NULL,
                    turn_id     TEXT NOT NULL,
                    name        TEXT NOT NULL,
                    arguments   TEXT NOT NULL,
                    result      TEXT NOT NULL,
                    duration_ms INTEGER NOT NULL,
                    error       TEXT
                )
                "#,
            ),
            (
                "inbox_messages table",
                r#"
                CREATE TABLE IF NOT EXISTS inbox_messages (
                    iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                    id           TEXT UNIQUE NOT NULL,
                    from_address TEXT NOT NULL,
                    to_address   TEXT NOT NULL,
                    content      TEXT NOT NULL,
                    signed_at    TEXT NOT NULL,
                    created_at   TEXT NOT NULL,
                    reply_to     TEXT,
                    processed_at TEXT
                )
                "#,
            ),
            (
                "action_results index",
                "CREATE INDEX IF NOT EXISTS idx_action_results_turn ON action_results(turn_id)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{what}: {e}")))?;
        }

        debug!("State database migrations complete");
        Ok(())
    }

    fn parse_time(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
    where
        T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
    {
        row.try_get(name)
            .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
    }

    fn row_to_turn(row: &SqliteRow) -> Result<Turn, StoreError> {
        let state: String = Self::column(row, "state")?;
        let input_source: Option<String> = Self::column(row, "input_source")?;
        let action_results: String = Self::column(row, "action_results")?;
        let token_usage: String = Self::column(row, "token_usage")?;
        let timestamp: String = Self::column(row, "timestamp")?;
        let cost_cents: i64 = Self::column(row, "cost_cents")?;

        Ok(Turn {
            id: Self::column(row, "id")?,
            timestamp: Self::parse_time(&timestamp),
            state: state.parse().map_err(StoreError::Corrupt)?,
            input: Self::column(row, "input")?,
            input_source: input_source
                .and_then(|s| serde_json::from_value(serde_json::Value::String(s)).ok()),
            thinking: Self::column(row, "thinking")?,
            action_results: serde_json::from_str(&action_results)
                .map_err(|e| StoreError::Corrupt(format!("action_results: {e}")))?,
            token_usage: serde_json::from_str(&token_usage).unwrap_or_default(),
            cost_cents: cost_cents.max(0) as u64,
        })
    }

    fn row_to_inbox(row: &SqliteRow) -> Result<InboxMessage, StoreError> {
        let signed_at: String = Self::column(row, "signed_at")?;
        let created_at: String = Self::column(row, "created_at")?;
        Ok(InboxMessage {
            id: Self::column(row, "id")?,
            from: Self::column(row, "from_address")?,
            to: Self::column(row, "to_address")?,
            content: Self::column(row, "content")?,
            signed_at: Self::parse_time(&signed_at),
            created_at: Self::parse_time(&created_at),
            reply_to: Self::column(row, "reply_to")?,
        })
    }
}

#[async_trait]
impl AutomatonDatabase for SqliteDatabase {
    async fn agent_state(&self) -> Result<AgentState, StoreError> {
        match self.get_kv(crate::AGENT_STATE_KEY).await? {
            Some(s) => s.parse().map_err(StoreError::Corrupt),
            None => Ok(AgentState::Setup),
        }
    }

    async fn set_agent_state(&self, state: AgentState) -> Result<(), StoreError> {
        self.set_kv(crate::AGENT_STATE_KEY, state.as_str()).await
    }

    async fn get_kv(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("kv get: {e}")))?;
        row.map(|r| Self::column(&r, "value")).transpose()
    }

    async fn set_kv(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("kv set: {e}")))?;
        Ok(())
    }

    async fn delete_kv(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("kv delete: {e}")))?;
        Ok(())
    }

    async fn get_identity(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM identity WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("identity get: {e}")))?;
        row.map(|r| Self::column(&r, "value")).transpose()
    }

    async fn set_identity(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO identity (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("identity set: {e}")))?;
        Ok(())
    }

    async fn insert_turn(&self, turn: &Turn) -> Result<(), StoreError> {
        let action_results = serde_json::to_string(&turn.action_results)
            .map_err(|e| StoreError::Storage(format!("action_results serialization: {e}")))?;
        let token_usage = serde_json::to_string(&turn.token_usage)
            .map_err(|e| StoreError::Storage(format!("token_usage serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO turns (id, timestamp, state, input, input_source, thinking,
                               action_results, token_usage, cost_cents)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&turn.id)
        .bind(turn.timestamp.to_rfc3339())
        .bind(turn.state.as_str())
        .bind(&turn.input)
        .bind(turn.input_source.map(|s| s.as_str()))
        .bind(&turn.thinking)
        .bind(&action_results)
        .bind(&token_usage)
        .bind(turn.cost_cents as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("turn insert: {e}")))?;

        debug!(turn_id = %turn.id, "Turn persisted");
        Ok(())
    }

    async fn insert_action_result(&self, turn_id: &str, result: &ActionResult) -> Result<(), StoreError> {
        let arguments = serde_json::to_string(&result.arguments)
            .map_err(|e| StoreError::Storage(format!("arguments serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO action_results (id, turn_id, name, arguments, result, duration_ms, error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&result.id)
        .bind(turn_id)
        .bind(&result.name)
        .bind(&arguments)
        .bind(&result.result)
        .bind(result.duration_ms as i64)
        .bind(&result.error)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("action result insert: {e}")))?;
        Ok(())
    }

    async fn recent_turns(&self, limit: usize) -> Result<Vec<Turn>, StoreError> {
        let rows = sqlx::query("SELECT * FROM turns ORDER BY iid DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("recent turns: {e}")))?;

        let mut turns = rows.iter().map(Self::row_to_turn).collect::<Result<Vec<_>, _>>()?;
        turns.reverse();
        Ok(turns)
    }

    async fn turn_count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM turns")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("turn count: {e}")))?;
        let count: i64 = Self::column(&row, "count")?;
        Ok(count as usize)
    }

    async fn insert_inbox_message(&self, message: &InboxMessage) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inbox_messages (id, from_address, to_address, content, signed_at, created_at, reply_to)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&message.id)
        .bind(&message.from)
        .bind(&message.to)
        .bind(&message.content)
        .bind(message.signed_at.to_rfc3339())
        .bind(message.created_at.to_rfc3339())
        .bind(&message.reply_to)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("inbox insert: {e}")))?;
        Ok(())
    }

    async fn unprocessed_inbox_messages(&self, limit: usize) -> Result<Vec<InboxMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM inbox_messages WHERE processed_at IS NULL ORDER BY iid ASC LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("inbox query: {e}")))?;

        rows.iter().map(Self::row_to_inbox).collect()
    }

    async fn mark_inbox_message_processed(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE inbox_messages SET processed_at = ?1 WHERE id = ?2 AND processed_at IS NULL")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("inbox update: {e}")))?;
        Ok(())
    }
}
