//! In-memory durable store. Useful for testing and dry runs.

use async_trait::async_trait;
use automaton_core::action::ActionResult;
use automaton_core::agent::{AgentState, Turn};
use automaton_core::error::StoreError;
use automaton_core::store::{AutomatonDatabase, InboxMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    kv: HashMap<String, String>,
    identity: HashMap<String, String>,
    turns: Vec<Turn>,
    action_results: Vec<(String, ActionResult)>,
    inbox: Vec<InboxEntry>,
}

struct InboxEntry {
    message: InboxMessage,
    processed: bool,
}

/// A store backed by process memory. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Action results recorded for one turn, in insertion order.
    pub async fn action_results_for(&self, turn_id: &str) -> Vec<ActionResult> {
        self.inner
            .read()
            .await
            .action_results
            .iter()
            .filter(|(id, _)| id == turn_id)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Whether an inbox message has been processed. `None` if unknown.
    pub async fn is_inbox_processed(&self, id: &str) -> Option<bool> {
        self.inner
            .read()
            .await
            .inbox
            .iter()
            .find(|e| e.message.id == id)
            .map(|e| e.processed)
    }
}

#[async_trait]
impl AutomatonDatabase for InMemoryDatabase {
    async fn agent_state(&self) -> Result<AgentState, StoreError> {
        let inner = self.inner.read().await;
        match inner.kv.get(crate::AGENT_STATE_KEY) {
            Some(s) => s.parse().map_err(StoreError::Corrupt),
            None => Ok(AgentState::Setup),
        }
    }

    async fn set_agent_state(&self, state: AgentState) -> Result<(), StoreError> {
        self.set_kv(crate::AGENT_STATE_KEY, state.as_str()).await
    }

    async fn get_kv(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().await.kv.get(key).cloned())
    }

    async fn set_kv(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.write().await.kv.insert(key.into(), value.into());
        Ok(())
    }

    async fn delete_kv(&self, key: &str) -> Result<(), StoreError> {
        self.inner.write().await.kv.remove(key);
        Ok(())
    }

    async fn get_identity(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().await.identity.get(key).cloned())
    }

    async fn set_identity(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.write().await.identity.insert(key.into(), value.into());
        Ok(())
    }

    async fn insert_turn(&self, turn: &Turn) -> Result<(), StoreError> {
        self.inner.write().await.turns.push(turn.clone());
        Ok(())
    }

    async fn insert_action_result(&self, turn_id: &str, result: &ActionResult) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .action_results
            .push((turn_id.to_string(), result.clone()));
        Ok(())
    }

    async fn recent_turns(&self, limit: usize) -> Result<Vec<Turn>, StoreError> {
        let inner = self.inner.read().await;
        let start = inner.turns.len().saturating_sub(limit);
        Ok(inner.turns[start..].to_vec())
    }

    async fn turn_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().await.turns.len())
    }

    async fn insert_inbox_message(&self, message: &InboxMessage) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.inbox.iter().any(|e| e.message.id == message.id) {
            inner.inbox.push(InboxEntry {
                message: message.clone(),
                processed: false,
            });
        }
        Ok(())
    }

    async fn unprocessed_inbox_messages(&self, limit: usize) -> Result<Vec<InboxMessage>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .inbox
            .iter()
            .filter(|e| !e.processed)
            .take(limit)
            .map(|e| e.message.clone())
            .collect())
    }

    async fn mark_inbox_message_processed(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.inbox.iter_mut().find(|e| e.message.id == id) {
            entry.processed = true;
        }
        Ok(())
    }
}
