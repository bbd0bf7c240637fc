//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid shutdown transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid conversation id: {0}")]
    InvalidConversationId(String),

    #[error("Toolset already built for this session")]
    ToolsetAlreadyBuilt,

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
