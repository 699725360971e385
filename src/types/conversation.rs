//! Conversation state structures
//!
//! A conversation is the durable record of a task: metadata, lineage, and the
//! accumulated message history. It outlives any session bound to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::ConversationId;

/// Lifecycle status of a conversation
///
/// Transitions are forward-only: `Created -> Active -> Ended`. A conversation
/// is never destroyed, only marked `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Created, no session has run yet
    Created,
    /// A session is (or has been) bound and processing turns
    Active,
    /// Terminal state; history remains queryable
    Ended,
}

impl ConversationStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Active => 1,
            Self::Ended => 2,
        }
    }

    /// Whether a transition from `self` to `next` is allowed
    ///
    /// Forward moves are allowed, regressions are not. `Ended -> Ended` is
    /// permitted so that overlapping teardown paths stay idempotent.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        next.rank() > self.rank() || (self == Self::Ended && next == Self::Ended)
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// Who produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message sent into the session
    User,
    /// Response produced by the backing agent
    Assistant,
}

/// One entry in a conversation's append-only history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who produced the entry
    pub role: Role,
    /// Message text
    pub text: String,
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time copy of a full conversation record
///
/// Returned by `get`; detached from the registry, so holding it never blocks
/// writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    /// Unique conversation identifier
    pub conversation_id: ConversationId,
    /// Short name for the task
    pub task_name: String,
    /// Full description/prompt for the agent
    pub task_description: String,
    /// Parent conversation, `None` for roots
    pub parent_conversation_id: Option<ConversationId>,
    /// 0 for roots, parent depth + 1 for children
    pub depth: u32,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// Current lifecycle status
    pub status: ConversationStatus,
    /// Full message history, oldest first
    pub history: Vec<HistoryEntry>,
}

/// One row of `list_conversations` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Unique conversation identifier
    pub conversation_id: ConversationId,
    /// Short name for the task
    pub task_name: String,
    /// Current lifecycle status
    pub status: ConversationStatus,
    /// Parent conversation, `None` for roots
    pub parent_conversation_id: Option<ConversationId>,
    /// 0 for roots, parent depth + 1 for children
    pub depth: u32,
    /// Number of history entries accumulated so far
    pub message_count: usize,
}
