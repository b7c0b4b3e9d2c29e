//! Error types for pushupd

use thiserror::Error;

use crate::UserId;

/// Core error type for pushupd operations
#[derive(Debug, Error)]
pub enum PushupError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("No rule found for user {0}")]
    NoRuleForUser(UserId),

    #[error("A command is already queued")]
    CommandPending,

    #[error("A session is already in progress")]
    SessionInProgress,

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Handoff file error: {0}")]
    HandoffError(String),
}

impl PushupError {
    pub fn invalid_command(msg: impl Into<String>) -> Self {
        Self::InvalidCommand(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn handoff(msg: impl Into<String>) -> Self {
        Self::HandoffError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PushupError>;
