//! Pass-through provider: no storage of its own, replays recent turns
//! straight from the durable store.
//!
//! This is the default provider (`legacy`).

use async_trait::async_trait;
use automaton_core::agent::Turn;
use automaton_core::error::MemoryError;
use automaton_core::identity::AutomatonIdentity;
use automaton_core::memory::MemoryProvider;
use automaton_core::message::ChatMessage;
use automaton_core::store::AutomatonDatabase;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Turns replayed into each prompt.
pub const MAX_CONTEXT_TURNS: usize = 20;

pub struct PassThroughMemory {
    db: Arc<dyn AutomatonDatabase>,
    awake: AtomicBool,
}

impl PassThroughMemory {
    pub fn new(db: Arc<dyn AutomatonDatabase>) -> Self {
        Self {
            db,
            awake: AtomicBool::new(false),
        }
    }
}

/// Render turns as conversation history, oldest first.
///
/// Per turn: the input as a user message tagged with its source, then the
/// thinking as an assistant message carrying the action requests, then one
/// tool message per action result.
pub fn build_context_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = Vec::new();

    for turn in turns {
        if let Some(input) = &turn.input {
            let source = turn.input_source.map(|s| s.as_str()).unwrap_or("system");
            messages.push(ChatMessage::user(format!("[{source}] {input}")));
        }

        if !turn.thinking.is_empty() {
            let calls = turn.action_results.iter().map(|r| r.to_tool_call()).collect();
            messages.push(ChatMessage::assistant(turn.thinking.clone()).with_tool_calls(calls));

            for result in &turn.action_results {
                messages.push(ChatMessage::tool_result(result.id.clone(), result.display_text()));
            }
        }
    }

    messages
}

#[async_trait]
impl MemoryProvider for PassThroughMemory {
    fn name(&self) -> &str {
        "legacy"
    }

    async fn init(&self) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn save_turn(&self, _turn: &Turn) -> Result<(), MemoryError> {
        // The loop already wrote the turn to the durable store
        Ok(())
    }

    async fn recall(&self, _hint: Option<&str>) -> Result<Vec<ChatMessage>, MemoryError> {
        if !self.awake.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        let turns = self.db.recent_turns(MAX_CONTEXT_TURNS).await?;
        Ok(build_context_messages(&turns))
    }

    async fn turn_count(&self) -> Result<usize, MemoryError> {
        Ok(self.db.turn_count().await?)
    }

    async fn recent_turns(&self, limit: usize) -> Result<Vec<Turn>, MemoryError> {
        Ok(self.db.recent_turns(limit).await?)
    }

    async fn on_wake(&self, _identity: &AutomatonIdentity) -> Result<(), MemoryError> {
        self.awake.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn on_sleep(&self) -> Result<(), MemoryError> {
        self.awake.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), MemoryError> {
        self.awake.store(false, Ordering::SeqCst);
        Ok(())
    }
}
