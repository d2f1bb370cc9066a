//! Error types for the Roost domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Roost operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Profile errors ---
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    // --- Task errors ---
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    // --- Turn routing/execution errors ---
    #[error("Turn error: {0}")]
    Turn(#[from] TurnError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

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

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    #[error("Profile lookup failed: {0}")]
    Lookup(String),
}

#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Task lookup failed: {0}")]
    Lookup(String),
}

#[derive(Debug, Clone, Error)]
pub enum TurnError {
    #[error("Strategy '{strategy}' failed: {reason}")]
    Execution { strategy: String, reason: String },

    #[error("Strategy '{strategy}' timed out after {timeout_secs}s")]
    Timeout { strategy: String, timeout_secs: u64 },

    #[error("Turn cancelled")]
    Cancelled,
}

impl TurnError {
    /// Convenience constructor for strategy execution failures.
    pub fn execution(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Execution {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }
}
