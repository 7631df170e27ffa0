//! Storage for session messages.

use async_trait::async_trait;
use automaton_core::error::MemoryError;
use automaton_core::message::Role;
use chrono::{DateTime, Utc};

/// One message recorded in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    /// `<turn-id>-input`, `<turn-id>-thinking` or `<turn-id>-tool-<i>`
    pub id: String,
    pub session_id: String,
    pub resource_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub embedding: Option<Vec<f32>>,
}

/// Backing store for the session provider.
///
/// Message lists are returned oldest first, in append order.
#[async_trait]
pub trait MessageStore: Send + Sync {
    fn name(&self) -> &str;

    async fn create_session(&self, session_id: &str, resource_id: &str) -> Result<(), MemoryError>;

    async fn append(&self, messages: Vec<StoredMessage>) -> Result<(), MemoryError>;

    /// The last `limit` messages of a session.
    async fn last_messages(&self, session_id: &str, limit: usize) -> Result<Vec<StoredMessage>, MemoryError>;

    async fn all_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, MemoryError>;

    /// Operator notes attached to a session.
    async fn working_memory(&self, session_id: &str) -> Result<Option<String>, MemoryError>;

    async fn set_working_memory(&self, session_id: &str, content: &str) -> Result<(), MemoryError>;
}
