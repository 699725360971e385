//! Error types for the conversation manager

use thiserror::Error;

use crate::types::{ConversationId, ConversationStatus, SessionId};

/// Main error type for conversation and session operations
#[derive(Error, Debug)]
pub enum C2cError {
    /// Conversation id does not resolve to a known conversation
    #[error("Unknown conversation: {0}")]
    UnknownConversation(ConversationId),

    /// Session id does not resolve to a live session
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    /// Parent conversation id is unknown or already ended
    #[error("Invalid parent conversation: {0}")]
    InvalidParent(ConversationId),

    /// Attempted a conversation status change that is not forward-only
    #[error("Invalid status transition for {conversation_id}: {from} -> {to}")]
    InvalidTransition {
        /// Conversation whose status change was rejected
        conversation_id: ConversationId,
        /// Status the conversation currently holds
        from: ConversationStatus,
        /// Status the caller asked for
        to: ConversationStatus,
    },

    /// Conversation has already ended and cannot host a session
    #[error("Conversation {0} has ended")]
    ConversationEnded(ConversationId),

    /// A live session is already bound to the conversation
    #[error("Conversation {conversation_id} already has active session {session_id}")]
    SessionAlreadyActive {
        /// Conversation the caller tried to start a second session on
        conversation_id: ConversationId,
        /// The session already bound to it
        session_id: SessionId,
    },

    /// Session cannot accept the operation in its current state
    #[error("Session {session_id} is not ready: {reason}")]
    SessionNotReady {
        /// Session that rejected the operation
        session_id: SessionId,
        /// Why the operation was rejected
        reason: String,
    },

    /// Session has ended (or ended while an operation was waiting on it)
    #[error("Session {0} has ended")]
    SessionEnded(SessionId),

    /// The backing agent-execution capability failed during a turn
    #[error("Agent execution failed: {0}")]
    AgentExecution(String),
}

/// Result type alias for conversation manager operations
pub type Result<T> = std::result::Result<T, C2cError>;

impl C2cError {
    /// Create a `SessionNotReady` error
    pub fn not_ready(session_id: SessionId, reason: impl Into<String>) -> Self {
        Self::SessionNotReady {
            session_id,
            reason: reason.into(),
        }
    }

    /// Create an `AgentExecution` error
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::AgentExecution(msg.into())
    }
}
