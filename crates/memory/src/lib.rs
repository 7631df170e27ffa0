//! Memory providers for the automaton.
//!
//! - **PassThroughMemory** (`legacy`): replays recent turns from the durable store
//! - **SessionMemory** (`session`): one session per wake cycle, with optional
//!   semantic recall over embedded messages
//!
//! Providers are built by name through [`create_memory_provider`].

pub mod embedding;
pub mod in_memory;
pub mod message_store;
pub mod pass_through;
pub mod registry;
pub mod session;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use embedding::{Embedder, HashEmbedder};
pub use in_memory::InMemoryMessageStore;
pub use message_store::{MessageStore, StoredMessage};
pub use pass_through::{PassThroughMemory, build_context_messages};
pub use registry::{available_providers, create_memory_provider};
pub use session::{SessionMemory, SessionSettings};
pub use vector::{cosine_similarity, vector_search};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMessageStore;
