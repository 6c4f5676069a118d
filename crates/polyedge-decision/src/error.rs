//! Decision errors.

use thiserror::Error;

/// Errors raised around the decision client.
#[derive(Error, Debug)]
pub enum DecisionError {
    /// The client could not build a user context.
    #[error("Failed to create decision context for {user_id}: {message}")]
    Context { user_id: String, message: String },

    /// The client failed to decide.
    #[error("Decision failed: {0}")]
    Decide(String),

    /// A listener left a payload that could not be read back.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for decision operations.
pub type Result<T, E = DecisionError> = std::result::Result<T, E>;
