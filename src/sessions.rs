//! Session registry
//!
//! Tracks the set of live sessions, maps session ids to runtime handles, and
//! enforces the one-active-runtime-per-conversation invariant. The registry
//! lock guards only the maps; every operation that can take agent-scale time
//! happens on a runtime handle cloned out of the lock, so one session's turn
//! never blocks another's `start`/`send`/`receive`/`end`.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::agent::AgentExecutor;
use crate::conversations::ConversationRegistry;
use crate::error::{C2cError, Result};
use crate::ids::IdAllocator;
use crate::runtime::SessionRuntime;
use crate::types::{ConversationId, ConversationStatus, SessionId, SessionSummary};

#[derive(Default)]
struct SessionMaps {
    sessions: HashMap<SessionId, Arc<SessionRuntime>>,
    // One live session per conversation; entries exist from reservation at
    // start until teardown, covering the window while the runtime spawns.
    by_conversation: HashMap<ConversationId, SessionId>,
}

/// Registry of live sessions
pub struct SessionRegistry {
    maps: Mutex<SessionMaps>,
    conversations: Arc<ConversationRegistry>,
    executor: Arc<dyn AgentExecutor>,
    ids: IdAllocator,
}

impl SessionRegistry {
    /// Create a registry backed by the given conversation registry and
    /// agent-execution capability
    pub fn new(
        conversations: Arc<ConversationRegistry>,
        executor: Arc<dyn AgentExecutor>,
    ) -> Self {
        Self {
            maps: Mutex::new(SessionMaps::default()),
            conversations,
            executor,
            ids: IdAllocator::new(),
        }
    }

    /// Start a session for an existing, non-ended conversation
    ///
    /// Rejects with `ConversationEnded` when the conversation is already
    /// over, and with `SessionAlreadyActive` when a live session is bound to
    /// it. The conversation slot is reserved before the runtime spawn, so two
    /// concurrent starts on one conversation yield exactly one success. A
    /// conversation ended during the spawn itself is caught afterwards: the
    /// fresh session is torn down and the call fails with
    /// `ConversationEnded`, so no session ever outlives its conversation.
    pub async fn start(&self, conversation_id: &ConversationId) -> Result<SessionId> {
        if self.conversations.status(conversation_id).await? == ConversationStatus::Ended {
            return Err(C2cError::ConversationEnded(conversation_id.clone()));
        }

        let session_id = self.ids.session_id();

        // Reserve the conversation slot before the (awaiting) spawn.
        {
            let mut maps = self.maps.lock().await;
            if let Some(existing) = maps.by_conversation.get(conversation_id) {
                return Err(C2cError::SessionAlreadyActive {
                    conversation_id: conversation_id.clone(),
                    session_id: existing.clone(),
                });
            }
            maps.by_conversation
                .insert(conversation_id.clone(), session_id.clone());
        }

        let runtime = match SessionRuntime::spawn(
            session_id.clone(),
            conversation_id.clone(),
            Arc::clone(&self.conversations),
            self.executor.as_ref(),
        )
        .await
        {
            Ok(runtime) => runtime,
            Err(e) => {
                // Release the reservation; the conversation stays usable.
                self.maps.lock().await.by_conversation.remove(conversation_id);
                return Err(e);
            }
        };

        self.maps
            .lock()
            .await
            .sessions
            .insert(session_id.clone(), Arc::new(runtime));

        // The conversation may have been ended while the runtime was
        // spawning; at that point `end` saw only the reservation and had no
        // runtime to tear down. A session must not outlive its conversation,
        // so undo the start and report the terminal state.
        if self.conversations.status(conversation_id).await? == ConversationStatus::Ended {
            self.end(&session_id).await?;
            return Err(C2cError::ConversationEnded(conversation_id.clone()));
        }

        // First session start activates the conversation; a start that races
        // an end loses benignly and the status stays terminal.
        if let Err(e) = self
            .conversations
            .set_status(conversation_id, ConversationStatus::Active)
            .await
        {
            log::debug!(
                "Conversation {} not moved to active at session start: {}",
                conversation_id,
                e
            );
        }

        log::info!(
            "Started session {} for conversation {}",
            session_id,
            conversation_id
        );
        Ok(session_id)
    }

    /// Runtime handle for a live session
    pub async fn get(&self, session_id: &SessionId) -> Result<Arc<SessionRuntime>> {
        let maps = self.maps.lock().await;
        maps.sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| C2cError::UnknownSession(session_id.clone()))
    }

    /// Live session bound to a conversation, if any
    pub async fn get_by_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Option<SessionId> {
        let maps = self.maps.lock().await;
        maps.by_conversation.get(conversation_id).cloned()
    }

    /// End a session and remove it from the registry
    ///
    /// Idempotent: ending an unknown (already ended) session is a no-op. The
    /// mapping is removed first so the session id is invalid immediately;
    /// runtime teardown then cancels any pending wait.
    pub async fn end(&self, session_id: &SessionId) -> Result<()> {
        let runtime = {
            let mut maps = self.maps.lock().await;
            match maps.sessions.remove(session_id) {
                Some(runtime) => {
                    maps.by_conversation.remove(runtime.conversation_id());
                    runtime
                }
                None => return Ok(()),
            }
        };
        runtime.end().await
    }

    /// Summaries of every live session
    ///
    /// Handles are cloned out of the registry lock before each runtime is
    /// queried, so the listing never stalls behind an in-flight turn.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let runtimes: Vec<Arc<SessionRuntime>> = {
            let maps = self.maps.lock().await;
            maps.sessions.values().cloned().collect()
        };

        let mut summaries = Vec::with_capacity(runtimes.len());
        for runtime in runtimes {
            summaries.push(runtime.summary());
        }
        summaries.sort_by(|a, b| a.session_id.as_str().cmp(b.session_id.as_str()));
        summaries
    }

    /// End every live session (process shutdown path)
    ///
    /// Teardown errors are logged, not propagated; the sessions are being
    /// discarded regardless.
    pub async fn shutdown(&self) {
        let session_ids: Vec<SessionId> = {
            let maps = self.maps.lock().await;
            maps.sessions.keys().cloned().collect()
        };
        for session_id in session_ids {
            if let Err(e) = self.end(&session_id).await {
                log::warn!("Failed to end session {} during shutdown: {}", session_id, e);
            }
        }
    }
}
