//! Identity allocation for conversations and sessions
//!
//! Ids are opaque strings built from a sanitized task-name slug plus a random
//! uuid suffix, so concurrent callers never collide and ids are never reused
//! for the lifetime of the process.

use uuid::Uuid;

use crate::types::{ConversationId, SessionId};

/// Length of the random hex suffix appended to every id
const ID_SUFFIX_LEN: usize = 12;

/// Allocator for conversation and session identifiers
///
/// Stateless and lock-free: uniqueness comes from the random uuid suffix, so
/// it tolerates concurrent callers, including reentrant ones spawned from
/// inside a running session.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator;

impl IdAllocator {
    /// Create a new allocator
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Allocate a conversation id embedding the sanitized task name
    #[must_use]
    pub fn conversation_id(&self, task_name: &str) -> ConversationId {
        let slug = sanitize_task_name(task_name);
        let suffix = random_suffix();
        if slug.is_empty() {
            ConversationId::new(format!("conv_{suffix}"))
        } else {
            ConversationId::new(format!("conv_{slug}_{suffix}"))
        }
    }

    /// Allocate a session id
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        SessionId::new(format!("sess_{}", random_suffix()))
    }
}

fn random_suffix() -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(ID_SUFFIX_LEN);
    hex
}

/// Lowercase the task name and squash everything non-alphanumeric to `-`
fn sanitize_task_name(task_name: &str) -> String {
    let slug: String = task_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sanitizes_task_names() {
        assert_eq!(sanitize_task_name("Fix the build"), "fix-the-build");
        assert_eq!(sanitize_task_name("--weird__name!!"), "weird--name");
        assert_eq!(sanitize_task_name("already-clean"), "already-clean");
        assert_eq!(sanitize_task_name("???"), "");
    }

    #[test]
    fn conversation_ids_embed_slug() {
        let ids = IdAllocator::new();
        let id = ids.conversation_id("Review PR");
        assert!(id.as_str().starts_with("conv_review-pr_"));

        // A slug-less name still yields a valid id
        let id = ids.conversation_id("!!!");
        assert!(id.as_str().starts_with("conv_"));
    }

    #[test]
    fn ids_are_unique_across_many_allocations() {
        let ids = IdAllocator::new();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(ids.session_id()));
        }
    }
}
