//! Durable operational store implementations.
//!
//! - **InMemoryDatabase**: process-local, for tests and dry runs
//! - **SqliteDatabase**: single-file SQLite store (default)

pub mod in_memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

/// KV key under which the agent state is persisted.
pub(crate) const AGENT_STATE_KEY: &str = "agent_state";
