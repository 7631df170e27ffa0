//! Durable operational store: agent state, key-value flags, turn log,
//! and the inbox of peer messages.

use crate::action::ActionResult;
use crate::agent::{AgentState, Turn};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known key-value entries.
pub mod keys {
    /// RFC 3339 time of the first ever wake
    pub const START_TIME: &str = "start_time";
    /// RFC 3339 time before which the agent stays parked
    pub const SLEEP_UNTIL: &str = "sleep_until";
    /// Set by out-of-process writers to cut a sleep short
    pub const WAKE_REQUEST: &str = "wake_request";
}

/// A message from another agent waiting in the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub content: String,
    pub signed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl InboxMessage {
    pub fn new(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: from.into(),
            to: to.into(),
            content: content.into(),
            signed_at: now,
            created_at: now,
            reply_to: None,
        }
    }
}

/// The durable store trait.
#[async_trait]
pub trait AutomatonDatabase: Send + Sync {
    /// Current agent state; `setup` when never written.
    async fn agent_state(&self) -> Result<AgentState, StoreError>;
    async fn set_agent_state(&self, state: AgentState) -> Result<(), StoreError>;

    async fn get_kv(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set_kv(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete_kv(&self, key: &str) -> Result<(), StoreError>;

    /// Identity fields (name, address, creator) stored as key-value pairs.
    async fn get_identity(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set_identity(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn insert_turn(&self, turn: &Turn) -> Result<(), StoreError>;
    async fn insert_action_result(&self, turn_id: &str, result: &ActionResult) -> Result<(), StoreError>;

    /// Most recent turns, oldest first.
    async fn recent_turns(&self, limit: usize) -> Result<Vec<Turn>, StoreError>;
    async fn turn_count(&self) -> Result<usize, StoreError>;

    async fn insert_inbox_message(&self, message: &InboxMessage) -> Result<(), StoreError>;
    /// Oldest unprocessed messages first.
    async fn unprocessed_inbox_messages(&self, limit: usize) -> Result<Vec<InboxMessage>, StoreError>;
    async fn mark_inbox_message_processed(&self, id: &str) -> Result<(), StoreError>;
}
