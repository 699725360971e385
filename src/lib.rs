//! # C2C - Agent-to-Agent Conversation Manager
//!
//! A lifecycle and concurrency manager for agent-to-agent conversations: one
//! agent process spawns, messages, and supervises other agent sessions while
//! the parent/child lineage tree is tracked across recursive spawns.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use c2c::{AgentExecutor, ConversationManager};
//!
//! async fn example(executor: Arc<dyn AgentExecutor>) -> c2c::Result<()> {
//!     let manager = ConversationManager::new(executor);
//!
//!     let (conversation_id, session_id) = manager
//!         .create_conversation_and_start_session("review", "Review the open PR", None)
//!         .await?;
//!
//!     // Fire-and-forget send; the reply is collected separately, so several
//!     // sessions can be in flight at once.
//!     manager.send_message(&session_id, "Start with the tests").await?;
//!     let reply = manager.receive_response(&session_id).await?;
//!     log::info!("agent said: {reply}");
//!
//!     manager.end_session(&session_id).await?;
//!     // The conversation record and its history remain queryable.
//!     let snapshot = manager.get_conversation(&conversation_id).await?;
//!     assert!(!snapshot.history.is_empty());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`]: ids, statuses, history entries, snapshots, and summaries
//! - [`ids`]: identity allocation for conversations and sessions
//! - [`conversations`]: durable conversation registry (metadata + history)
//! - [`runtime`]: per-session state machine and background worker
//! - [`sessions`]: live-session registry and teardown
//! - [`manager`]: the composed tool surface
//! - [`agent`]: the consumed agent-execution capability boundary
//! - [`error`]: typed error taxonomy
//!
//! ## Concurrency model
//!
//! Every session owns an independent background worker; suspension happens
//! only in `receive_response`, on that session's own result channel. The two
//! registries are the only shared mutable state and both serialize writers
//! per key, so unrelated conversations never contend and a session's worker
//! can reenter the manager to spawn children.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod conversations;
pub mod error;
pub mod ids;
pub mod manager;
pub mod runtime;
pub mod sessions;
pub mod types;

// Re-export commonly used types for external API
pub use agent::{AgentExecutor, AgentHandle};
pub use conversations::ConversationRegistry;
pub use error::{C2cError, Result};
pub use manager::ConversationManager;
pub use runtime::SessionRuntime;
pub use sessions::SessionRegistry;
pub use types::{
    ConversationId, ConversationSnapshot, ConversationStatus, ConversationSummary, HistoryEntry,
    Role, SessionId, SessionStatus, SessionSummary,
};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
