//! Domain events published by the agent loop.
//!
//! Observers (CLI, status displays, tests) subscribe to the bus instead of
//! polling the durable store.

use crate::agent::AgentState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The persisted agent state changed
    StateChanged {
        state: AgentState,
        timestamp: DateTime<Utc>,
    },

    /// A cycle finished and its turn was persisted
    TurnCompleted {
        turn_id: String,
        action_count: usize,
        total_tokens: u32,
        cost_cents: u64,
        timestamp: DateTime<Utc>,
    },

    /// An action went through the execution gate
    ActionExecuted {
        action_name: String,
        success: bool,
        blocked: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A cycle failed
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Short name for logs and filters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::TurnCompleted { .. } => "turn_completed",
            Self::ActionExecuted { .. } => "action_executed",
            Self::ErrorOccurred { .. } => "error_occurred",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::StateChanged { timestamp, .. }
            | Self::TurnCompleted { timestamp, .. }
            | Self::ActionExecuted { timestamp, .. }
            | Self::ErrorOccurred { timestamp, .. } => *timestamp,
        }
    }
}

/// Slow subscribers lag and lose the oldest events past this many.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Fan-out of loop events over `tokio::sync::broadcast`.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: DomainEvent) -> usize {
        self.sender.send(Arc::new(event)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
