//! Conversation registry
//!
//! Durable record of every conversation: metadata, lineage, status, and the
//! append-only message history. Records survive session teardown and are only
//! ever marked ended, never removed.
//!
//! Locking is two-level: an outer `RwLock` guards the id -> record map, and
//! each record sits behind its own `Mutex`. Writers to different
//! conversations never contend, and readers snapshot without blocking
//! writers for long.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{C2cError, Result};
use crate::ids::IdAllocator;
use crate::types::{
    ConversationId, ConversationSnapshot, ConversationStatus, ConversationSummary, HistoryEntry,
    Role,
};

#[derive(Debug)]
struct ConversationRecord {
    task_name: String,
    task_description: String,
    parent_conversation_id: Option<ConversationId>,
    depth: u32,
    created_at: DateTime<Utc>,
    status: ConversationStatus,
    history: Vec<HistoryEntry>,
}

type ConversationMap = HashMap<ConversationId, Arc<Mutex<ConversationRecord>>>;

/// Registry of all conversations known to the process
#[derive(Debug)]
pub struct ConversationRegistry {
    conversations: RwLock<ConversationMap>,
    ids: IdAllocator,
}

impl ConversationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            ids: IdAllocator::new(),
        }
    }

    /// Create a new conversation, optionally as a child of `parent_id`
    ///
    /// Allocates the identity, records the lineage edge, and stores the
    /// record with `status=created` and an empty history. Fails with
    /// `InvalidParent` if the parent is unknown or already ended.
    pub async fn create(
        &self,
        task_name: &str,
        task_description: &str,
        parent_id: Option<&ConversationId>,
    ) -> Result<ConversationId> {
        let depth = match parent_id {
            None => 0,
            Some(parent) => {
                let record = {
                    let map = self.conversations.read().await;
                    map.get(parent)
                        .cloned()
                        .ok_or_else(|| C2cError::InvalidParent(parent.clone()))?
                };
                let parent_record = record.lock().await;
                if parent_record.status == ConversationStatus::Ended {
                    return Err(C2cError::InvalidParent(parent.clone()));
                }
                parent_record.depth + 1
            }
        };

        let conversation_id = self.ids.conversation_id(task_name);
        let record = ConversationRecord {
            task_name: task_name.to_string(),
            task_description: task_description.to_string(),
            parent_conversation_id: parent_id.cloned(),
            depth,
            created_at: Utc::now(),
            status: ConversationStatus::Created,
            history: Vec::new(),
        };

        self.conversations
            .write()
            .await
            .insert(conversation_id.clone(), Arc::new(Mutex::new(record)));

        log::debug!(
            "Created conversation {} (depth {}, parent {:?})",
            conversation_id,
            depth,
            parent_id.map(ConversationId::as_str)
        );

        Ok(conversation_id)
    }

    /// Atomically append one history entry
    pub async fn append_history(
        &self,
        conversation_id: &ConversationId,
        role: Role,
        text: &str,
    ) -> Result<()> {
        let record = self.record(conversation_id).await?;
        let mut record = record.lock().await;
        record.history.push(HistoryEntry {
            role,
            text: text.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Advance a conversation's status
    ///
    /// Transitions are forward-only (`created -> active -> ended`);
    /// `ended -> ended` is accepted as a no-op so overlapping teardown paths
    /// stay idempotent. Anything else is `InvalidTransition`.
    pub async fn set_status(
        &self,
        conversation_id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<()> {
        let record = self.record(conversation_id).await?;
        let mut record = record.lock().await;
        if !record.status.can_transition_to(status) {
            return Err(C2cError::InvalidTransition {
                conversation_id: conversation_id.clone(),
                from: record.status,
                to: status,
            });
        }
        record.status = status;
        Ok(())
    }

    /// Current status of a conversation
    pub async fn status(&self, conversation_id: &ConversationId) -> Result<ConversationStatus> {
        let record = self.record(conversation_id).await?;
        let record = record.lock().await;
        Ok(record.status)
    }

    /// Point-in-time snapshot of a full conversation record
    pub async fn get(&self, conversation_id: &ConversationId) -> Result<ConversationSnapshot> {
        let record = self.record(conversation_id).await?;
        let record = record.lock().await;
        Ok(ConversationSnapshot {
            conversation_id: conversation_id.clone(),
            task_name: record.task_name.clone(),
            task_description: record.task_description.clone(),
            parent_conversation_id: record.parent_conversation_id.clone(),
            depth: record.depth,
            created_at: record.created_at,
            status: record.status,
            history: record.history.clone(),
        })
    }

    /// Summaries of every conversation, live session or not
    ///
    /// Record handles are collected under the read lock, then each record is
    /// locked individually, so a long-held per-record lock never stalls the
    /// whole listing.
    pub async fn list(&self) -> Vec<ConversationSummary> {
        let records: Vec<(ConversationId, Arc<Mutex<ConversationRecord>>)> = {
            let map = self.conversations.read().await;
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let mut summaries = Vec::with_capacity(records.len());
        for (conversation_id, record) in records {
            let record = record.lock().await;
            summaries.push(ConversationSummary {
                conversation_id,
                task_name: record.task_name.clone(),
                status: record.status,
                parent_conversation_id: record.parent_conversation_id.clone(),
                depth: record.depth,
                message_count: record.history.len(),
            });
        }
        summaries.sort_by(|a, b| a.conversation_id.as_str().cmp(b.conversation_id.as_str()));
        summaries
    }

    async fn record(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Arc<Mutex<ConversationRecord>>> {
        let map = self.conversations.read().await;
        map.get(conversation_id)
            .cloned()
            .ok_or_else(|| C2cError::UnknownConversation(conversation_id.clone()))
    }
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
