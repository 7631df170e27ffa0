//! In-memory message store. Useful for testing and ephemeral sessions.

use crate::message_store::{MessageStore, StoredMessage};
use async_trait::async_trait;
use automaton_core::error::MemoryError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, String>,
    messages: Vec<StoredMessage>,
    working_memory: HashMap<String, String>,
}

/// Stores session messages in a Vec. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions created so far.
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create_session(&self, session_id: &str, resource_id: &str) -> Result<(), MemoryError> {
        self.inner
            .write()
            .await
            .sessions
            .insert(session_id.into(), resource_id.into());
        Ok(())
    }

    async fn append(&self, messages: Vec<StoredMessage>) -> Result<(), MemoryError> {
        let mut inner = self.inner.write().await;
        for msg in messages {
            match inner.messages.iter_mut().find(|m| m.id == msg.id) {
                Some(existing) => *existing = msg,
                None => inner.messages.push(msg),
            }
        }
        Ok(())
    }

    async fn last_messages(&self, session_id: &str, limit: usize) -> Result<Vec<StoredMessage>, MemoryError> {
        let mut all = self.all_messages(session_id).await?;
        let start = all.len().saturating_sub(limit);
        Ok(all.split_off(start))
    }

    async fn all_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, MemoryError> {
        Ok(self
            .inner
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn working_memory(&self, session_id: &str) -> Result<Option<String>, MemoryError> {
        Ok(self.inner.read().await.working_memory.get(session_id).cloned())
    }

    async fn set_working_memory(&self, session_id: &str, content: &str) -> Result<(), MemoryError> {
        self.inner
            .write()
            .await
            .working_memory
            .insert(session_id.into(), content.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_core::message::Role;
    use chrono::Utc;

    fn msg(id: &str, session: &str) -> StoredMessage {
        StoredMessage {
            id: id.into(),
            session_id: session.into(),
            resource_id: "0xabc".into(),
            role: Role::User,
            content: format!("content {id}"),
            created_at: Utc::now(),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn messages_are_scoped_by_session() {
        let store = InMemoryMessageStore::new();
        store
            .append(vec![msg("a", "s1"), msg("b", "s2"), msg("c", "s1")])
            .await
            .unwrap();

        let s1: Vec<_> = store.all_messages("s1").await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(s1, ["a", "c"]);
        assert!(store.all_messages("s3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_messages_keeps_tail() {
        let store = InMemoryMessageStore::new();
        let batch = (0..5).map(|i| msg(&format!("m{i}"), "s")).collect();
        store.append(batch).await.unwrap();

        let tail: Vec<_> = store.last_messages("s", 2).await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(tail, ["m3", "m4"]);
    }

    #[tokio::test]
    async fn append_replaces_same_id() {
        let store = InMemoryMessageStore::new();
        store.append(vec![msg("a", "s")]).await.unwrap();
        let mut again = msg("a", "s");
        again.content = "updated".into();
        store.append(vec![again]).await.unwrap();

        let all = store.all_messages("s").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "updated");
    }

    #[tokio::test]
    async fn working_memory_round_trip() {
        let store = InMemoryMessageStore::new();
        assert!(store.working_memory("s").await.unwrap().is_none());
        store.set_working_memory("s", "- goal: earn").await.unwrap();
        assert_eq!(store.working_memory("s").await.unwrap().as_deref(), Some("- goal: earn"));
    }
}
