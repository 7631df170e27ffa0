//! Error types for the automaton domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all automaton operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Reasoning backend errors ---
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    // --- Durable store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Memory provider errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Action errors ---
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    // --- Execution backend errors ---
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    // --- Peer messaging errors ---
    #[error("Social error: {0}")]
    Social(#[from] SocialError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by inference backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Inference backend not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Unknown memory provider: \"{name}\". Available: {available}")]
    UnknownProvider { name: String, available: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("{reason}")]
    ExecutionFailed { action_name: String, reason: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Sandbox(#[from] SandboxError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Social(#[from] SocialError),
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Command execution failed: {0}")]
    ExecFailed(String),

    #[error("Command timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("File operation failed on {path}: {reason}")]
    File { path: String, reason: String },

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(String),
}

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("Message delivery failed to {to}: {reason}")]
    DeliveryFailed { to: String, reason: String },

    #[error("Social relay unavailable: {0}")]
    Unavailable(String),
}
