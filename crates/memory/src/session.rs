//! Session provider: one session per wake cycle.
//!
//! Each `on_wake` opens a fresh `wake-<uuid>` session scoped to the
//! automaton's address. Turns are flattened into role-tagged messages and
//! recalled as the tail of the session, optionally widened by a semantic
//! search around a hint. Storage failures are logged and never reach the
//! agent loop.

use crate::embedding::Embedder;
use crate::message_store::{MessageStore, StoredMessage};
use crate::vector;
use async_trait::async_trait;
use automaton_core::agent::Turn;
use automaton_core::error::MemoryError;
use automaton_core::identity::AutomatonIdentity;
use automaton_core::memory::MemoryProvider;
use automaton_core::message::{ChatMessage, Role};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Turns kept in the local recent-turn cache.
pub const RECENT_TURN_CACHE: usize = 20;

/// Characters of an action result kept in a session message.
pub const TOOL_RESULT_PREVIEW: usize = 500;

/// Recall tuning.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub last_messages: usize,
    pub semantic_recall: bool,
    pub semantic_top_k: usize,
    /// Neighbours included before each semantic match
    pub context_before: usize,
    /// Neighbours included after each semantic match
    pub context_after: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            last_messages: 40,
            semantic_recall: true,
            semantic_top_k: 5,
            context_before: 2,
            context_after: 1,
        }
    }
}

#[derive(Default)]
struct SessionState {
    session_id: Option<String>,
    resource_id: String,
    turn_count: usize,
    recent: VecDeque<Turn>,
}

pub struct SessionMemory {
    store: Arc<dyn MessageStore>,
    embedder: Option<Arc<dyn Embedder>>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
}

impl SessionMemory {
    pub fn new(store: Arc<dyn MessageStore>, settings: SessionSettings) -> Self {
        Self {
            store,
            embedder: None,
            settings,
            state: Mutex::new(SessionState {
                resource_id: "automaton".into(),
                ..SessionState::default()
            }),
        }
    }

    /// Enable embeddings for semantic recall.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// The active session id, if awake.
    pub async fn session_id(&self) -> Option<String> {
        self.state.lock().await.session_id.clone()
    }

    /// Replace the operator notes of the active session.
    #[cfg(test)]
    pub(crate) async fn update_working_memory(&self, notes: &str) -> Result<(), MemoryError> {
        let Some(session_id) = self.session_id().await else {
            return Ok(());
        };
        self.store.set_working_memory(&session_id, notes).await
    }

    fn semantic_embedder(&self) -> Option<&Arc<dyn Embedder>> {
        self.embedder.as_ref().filter(|_| self.settings.semantic_recall)
    }

    /// Flatten a turn into session messages.
    fn turn_to_messages(turn: &Turn, session_id: &str, resource_id: &str) -> Vec<StoredMessage> {
        let make = |suffix: String, role: Role, content: String| StoredMessage {
            id: format!("{}-{suffix}", turn.id),
            session_id: session_id.to_string(),
            resource_id: resource_id.to_string(),
            role,
            content,
            created_at: turn.timestamp,
            embedding: None,
        };

        let mut messages = Vec::new();

        if let Some(input) = &turn.input {
            let source = turn.input_source.map(|s| s.as_str()).unwrap_or("system");
            messages.push(make("input".into(), Role::User, format!("[{source}] {input}")));
        }

        if !turn.thinking.is_empty() {
            messages.push(make("thinking".into(), Role::Assistant, turn.thinking.clone()));
        }

        for (i, result) in turn.action_results.iter().enumerate() {
            let body = match &result.error {
                Some(e) => format!("Error: {e}"),
                None => result.result.chars().take(TOOL_RESULT_PREVIEW).collect(),
            };
            messages.push(make(
                format!("tool-{i}"),
                Role::Assistant,
                format!("[tool:{}] {body}", result.name),
            ));
        }

        messages
    }

    async fn write_messages(&self, mut messages: Vec<StoredMessage>) -> Result<(), MemoryError> {
        if messages.is_empty() {
            return Ok(());
        }
        if let Some(embedder) = self.semantic_embedder() {
            let texts: Vec<String> = messages.iter().map(|m| m.content.clone()).collect();
            match embedder.embed(&texts).await {
                Ok(vectors) => {
                    for (msg, v) in messages.iter_mut().zip(vectors) {
                        msg.embedding = Some(v);
                    }
                }
                Err(e) => warn!(error = %e, "Embedding failed, storing without vectors"),
            }
        }
        self.store.append(messages).await
    }

    async fn recall_from_store(&self, session_id: &str, hint: Option<&str>) -> Result<Vec<StoredMessage>, MemoryError> {
        let semantic = match (hint, self.semantic_embedder()) {
            (Some(hint), Some(embedder)) if !hint.trim().is_empty() => Some((hint, embedder)),
            _ => None,
        };

        let Some((hint, embedder)) = semantic else {
            return self.store.last_messages(session_id, self.settings.last_messages).await;
        };

        let all = self.store.all_messages(session_id).await?;
        let query = embedder
            .embed(&[hint.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::EmbeddingFailed("no vector returned for hint".into()))?;

        let mut selected: BTreeSet<usize> = (all.len().saturating_sub(self.settings.last_messages)..all.len()).collect();

        let matches = vector::vector_search(&all, &query, self.settings.semantic_top_k, f32::MIN);
        for (idx, _) in matches {
            let start = idx.saturating_sub(self.settings.context_before);
            let end = (idx + self.settings.context_after).min(all.len().saturating_sub(1));
            selected.extend(start..=end);
        }

        debug!(selected = selected.len(), total = all.len(), "Semantic recall");
        let mut all: Vec<Option<StoredMessage>> = all.into_iter().map(Some).collect();
        Ok(selected.into_iter().filter_map(|i| all[i].take()).collect())
    }
}

#[async_trait]
impl MemoryProvider for SessionMemory {
    fn name(&self) -> &str {
        "session"
    }

    async fn init(&self) -> Result<(), MemoryError> {
        info!(store = self.store.name(), semantic = self.settings.semantic_recall, "Session memory ready");
        Ok(())
    }

    async fn save_turn(&self, turn: &Turn) -> Result<(), MemoryError> {
        let mut state = self.state.lock().await;
        let Some(session_id) = state.session_id.clone() else {
            return Ok(());
        };

        let messages = Self::turn_to_messages(turn, &session_id, &state.resource_id);
        if let Err(e) = self.write_messages(messages).await {
            warn!(error = %e, "Session save_turn failed");
        }

        state.turn_count += 1;
        state.recent.push_back(turn.clone());
        while state.recent.len() > RECENT_TURN_CACHE {
            state.recent.pop_front();
        }
        Ok(())
    }

    async fn recall(&self, hint: Option<&str>) -> Result<Vec<ChatMessage>, MemoryError> {
        let Some(session_id) = self.session_id().await else {
            return Ok(Vec::new());
        };

        match self.recall_from_store(&session_id, hint).await {
            Ok(messages) => Ok(messages
                .into_iter()
                .filter_map(|m| match m.role {
                    Role::User => Some(ChatMessage::user(m.content)),
                    Role::Assistant => Some(ChatMessage::assistant(m.content)),
                    _ => None,
                })
                .collect()),
            Err(e) => {
                warn!(error = %e, "Session recall failed");
                Ok(Vec::new())
            }
        }
    }

    async fn turn_count(&self) -> Result<usize, MemoryError> {
        Ok(self.state.lock().await.turn_count)
    }

    async fn recent_turns(&self, limit: usize) -> Result<Vec<Turn>, MemoryError> {
        let state = self.state.lock().await;
        let skip = state.recent.len().saturating_sub(limit);
        Ok(state.recent.iter().skip(skip).cloned().collect())
    }

    async fn on_wake(&self, identity: &AutomatonIdentity) -> Result<(), MemoryError> {
        let mut state = self.state.lock().await;
        if state.session_id.is_some() {
            return Ok(());
        }
        state.resource_id = identity.address.clone();

        let session_id = format!("wake-{}", uuid::Uuid::new_v4());
        if let Err(e) = self.store.create_session(&session_id, &state.resource_id).await {
            warn!(error = %e, session = %session_id, "Session creation failed");
        }
        info!(session = %session_id, "Memory session opened");
        state.session_id = Some(session_id);
        Ok(())
    }

    async fn on_sleep(&self) -> Result<(), MemoryError> {
        self.state.lock().await.session_id = None;
        Ok(())
    }

    async fn close(&self) -> Result<(), MemoryError> {
        self.state.lock().await.session_id = None;
        Ok(())
    }

    /// Notes stored against the active session. No action writes them yet,
    /// so at runtime this only surfaces notes placed in the message store by
    /// another process.
    async fn working_memory(&self) -> Option<String> {
        let session_id = self.session_id().await?;
        match self.store.working_memory(&session_id).await {
            Ok(notes) => notes.filter(|n| !n.trim().is_empty()),
            Err(e) => {
                debug!(error = %e, "Working memory unavailable");
                None
            }
        }
    }
}
