//! Error types for the ledger chat agent

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Dialogue Errors
    // =============================

    /// Amount or identifier text was not numeric. Recovered locally by
    /// re-prompting; the dialog state is kept.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Entry #{0} not found")]
    NotFound(u64),

    #[error("Insufficient history: need {needed} entries, have {available}")]
    InsufficientHistory { needed: usize, available: usize },

    // =============================
    // Collaborator Errors
    // =============================

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
