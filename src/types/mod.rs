//! Type definitions for the conversation manager
//!
//! Organized into logical submodules:
//!
//! - [`identifiers`] - Type-safe ID wrappers (`ConversationId`, `SessionId`)
//! - [`conversation`] - Conversation status, history, and snapshot types
//! - [`session`] - Session status and summary types

pub mod conversation;
pub mod identifiers;
pub mod session;

// Re-export commonly used types
pub use conversation::{
    ConversationSnapshot, ConversationStatus, ConversationSummary, HistoryEntry, Role,
};
pub use identifiers::{ConversationId, SessionId};
pub use session::{SessionStatus, SessionSummary};
