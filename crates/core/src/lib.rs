//! # Automaton Core
//!
//! Domain types, traits, and error definitions for the automaton runtime.
//! This crate has **zero framework dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator of the agent loop is a trait here: the
//! reasoning backend, the execution backend, the durable store, the memory
//! provider, and peer messaging. Implementations live in their own crates,
//! which keeps the loop testable with scripted doubles.

pub mod action;
pub mod agent;
pub mod error;
pub mod event;
pub mod identity;
pub mod inference;
pub mod memory;
pub mod message;
pub mod sandbox;
pub mod social;
pub mod store;
pub mod survival;

// Re-export key types at crate root for ergonomics
pub use action::{ActionDefinition, ActionRequest, ActionResult};
pub use agent::{AgentState, FinancialState, InputSource, PendingInput, Turn};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use identity::AutomatonIdentity;
pub use inference::{FinishReason, InferenceClient, InferenceOptions, InferenceResponse, TokenUsage};
pub use memory::MemoryProvider;
pub use message::{ChatMessage, MessageToolCall, Role};
pub use sandbox::{ExecResult, ExecutionBackend};
pub use social::SocialClient;
pub use store::{AutomatonDatabase, InboxMessage};
pub use survival::SurvivalTier;
