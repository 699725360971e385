//! Conversation manager facade
//!
//! Composes the conversation registry, the session registry, and the
//! agent-execution capability into the tool surface a calling agent sees:
//! create/start/send/receive/end plus the read-only listing views. A session
//! worker may call back into the same manager to spawn child conversations;
//! no lock is held across an agent await, so those reentrant calls are
//! ordinary calls.

use std::sync::Arc;

use crate::agent::AgentExecutor;
use crate::conversations::ConversationRegistry;
use crate::error::Result;
use crate::sessions::SessionRegistry;
use crate::types::{
    ConversationId, ConversationSnapshot, ConversationStatus, ConversationSummary, SessionId,
    SessionSummary,
};

/// Lifecycle and concurrency manager for agent-to-agent conversations
///
/// Cheap to clone via `Arc`; every operation takes `&self` and is safe under
/// concurrent, including self-referential, access.
pub struct ConversationManager {
    conversations: Arc<ConversationRegistry>,
    sessions: Arc<SessionRegistry>,
}

impl ConversationManager {
    /// Create a manager backed by the given agent-execution capability
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        let conversations = Arc::new(ConversationRegistry::new());
        let sessions = Arc::new(SessionRegistry::new(
            Arc::clone(&conversations),
            executor,
        ));
        Self {
            conversations,
            sessions,
        }
    }

    /// Create a new conversation, optionally as a child of an existing one
    pub async fn create_conversation(
        &self,
        task_name: &str,
        task_description: &str,
        parent_conversation_id: Option<&ConversationId>,
    ) -> Result<ConversationId> {
        self.conversations
            .create(task_name, task_description, parent_conversation_id)
            .await
    }

    /// Start a session for an existing, non-ended conversation
    pub async fn start_session(&self, conversation_id: &ConversationId) -> Result<SessionId> {
        self.sessions.start(conversation_id).await
    }

    /// Create a conversation and start its session in one call
    ///
    /// If the session start fails, the conversation remains in `created`
    /// state rather than being rolled back, so the caller can retry
    /// `start_session` on it.
    pub async fn create_conversation_and_start_session(
        &self,
        task_name: &str,
        task_description: &str,
        parent_conversation_id: Option<&ConversationId>,
    ) -> Result<(ConversationId, SessionId)> {
        let conversation_id = self
            .create_conversation(task_name, task_description, parent_conversation_id)
            .await?;
        let session_id = self.start_session(&conversation_id).await?;
        Ok((conversation_id, session_id))
    }

    /// Send a message into a session's mailbox without waiting for the reply
    pub async fn send_message(&self, session_id: &SessionId, message: &str) -> Result<()> {
        let runtime = self.sessions.get(session_id).await?;
        runtime.send(message).await
    }

    /// Wait for the response to the session's in-flight message
    ///
    /// Blocks on that session only; turns in other sessions proceed
    /// independently.
    pub async fn receive_response(&self, session_id: &SessionId) -> Result<String> {
        let runtime = self.sessions.get(session_id).await?;
        runtime.receive().await
    }

    /// End a session; its conversation stays queryable with full history
    pub async fn end_session(&self, session_id: &SessionId) -> Result<()> {
        self.sessions.end(session_id).await
    }

    /// End a conversation, tearing down its bound session first if one exists
    pub async fn end_conversation(&self, conversation_id: &ConversationId) -> Result<()> {
        // Confirm the conversation exists before any teardown side effects.
        let status = self.conversations.status(conversation_id).await?;

        if let Some(session_id) = self.sessions.get_by_conversation(conversation_id).await {
            self.sessions.end(&session_id).await?;
        }

        if status != ConversationStatus::Ended {
            self.conversations
                .set_status(conversation_id, ConversationStatus::Ended)
                .await?;
        }
        Ok(())
    }

    /// Full snapshot of one conversation, including history
    pub async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationSnapshot> {
        self.conversations.get(conversation_id).await
    }

    /// Summaries of all conversations, live session or not
    pub async fn list_conversations(&self) -> Vec<ConversationSummary> {
        self.conversations.list().await
    }

    /// Summaries of all live sessions
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.sessions.list().await
    }

    /// End every live session (process shutdown path)
    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
    }
}
