//! Memory provider trait: what the agent remembers of its own history.
//!
//! A provider owns the conversation context that is recalled into each
//! prompt. Providers may keep their own storage (sessions, embeddings) or
//! read straight through to the durable store.

use crate::agent::Turn;
use crate::error::MemoryError;
use crate::identity::AutomatonIdentity;
use crate::message::ChatMessage;
use async_trait::async_trait;

/// The core memory provider trait.
///
/// Lifecycle: `init` once, then any number of `on_wake` / `on_sleep`
/// pairs, then `close`. All methods take `&self`; implementations use
/// interior mutability.
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    /// Provider name as used in configuration.
    fn name(&self) -> &str;

    /// One-time setup before first use.
    async fn init(&self) -> Result<(), MemoryError>;

    /// Record a completed turn. Empty turns still count.
    async fn save_turn(&self, turn: &Turn) -> Result<(), MemoryError>;

    /// Messages to place between the system section and the pending input,
    /// oldest first. Empty when no session is active.
    async fn recall(&self, hint: Option<&str>) -> Result<Vec<ChatMessage>, MemoryError>;

    async fn turn_count(&self) -> Result<usize, MemoryError>;

    /// Most recent turns, oldest first.
    async fn recent_turns(&self, limit: usize) -> Result<Vec<Turn>, MemoryError>;

    /// Start a wake cycle. Idempotent while already awake.
    async fn on_wake(&self, identity: &AutomatonIdentity) -> Result<(), MemoryError>;

    /// End the current wake cycle.
    async fn on_sleep(&self) -> Result<(), MemoryError>;

    async fn close(&self) -> Result<(), MemoryError>;

    /// Operator notes for the current session, if the provider keeps any.
    async fn working_memory(&self) -> Option<String> {
        None
    }
}
