//! Session state structures
//!
//! A session is the live execution unit bound to exactly one conversation,
//! processing one message turn at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::{ConversationId, SessionId};

/// Lifecycle status of a session runtime
///
/// `Starting -> Ready <-> Busy -> Ended`. `Ready` and `Busy` alternate once
/// per turn; `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Runtime is being constructed, not yet accepting messages
    Starting,
    /// Mailbox open, no turn in flight
    Ready,
    /// One message accepted and being processed by the backing agent
    Busy,
    /// Mailbox closed, worker released
    Ended,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Busy => "busy",
            Self::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// One row of `list_sessions` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Unique session identifier
    pub session_id: SessionId,
    /// Conversation this session is bound to
    pub conversation_id: ConversationId,
    /// Current runtime status
    pub status: SessionStatus,
    /// Messages accepted but not yet answered (0 or 1 under turn gating)
    pub pending_messages: usize,
    /// Last time the session accepted a message or produced a response
    pub last_activity: DateTime<Utc>,
}
