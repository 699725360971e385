//! Lineage tracking and recursive spawning

mod common;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use c2c::{C2cError, ConversationId, ConversationManager, ConversationStatus};

use common::{ScriptedExecutor, init_logs};

#[tokio::test]
async fn depth_follows_parentage() {
    init_logs();
    let manager = ConversationManager::new(ScriptedExecutor::echo());

    let root = manager.create_conversation("root", "d", None).await.unwrap();
    let child_a = manager
        .create_conversation("a", "d", Some(&root))
        .await
        .unwrap();
    let child_b = manager
        .create_conversation("b", "d", Some(&root))
        .await
        .unwrap();
    let grandchild = manager
        .create_conversation("a1", "d", Some(&child_a))
        .await
        .unwrap();

    let by_id: HashMap<ConversationId, (Option<ConversationId>, u32)> = manager
        .list_conversations()
        .await
        .into_iter()
        .map(|s| (s.conversation_id, (s.parent_conversation_id, s.depth)))
        .collect();

    assert_eq!(by_id[&root], (None, 0));
    assert_eq!(by_id[&child_a], (Some(root.clone()), 1));
    assert_eq!(by_id[&child_b], (Some(root.clone()), 1));
    assert_eq!(by_id[&grandchild], (Some(child_a.clone()), 2));

    // Walking parent edges always terminates at a root: a forest, no cycles.
    for start in by_id.keys() {
        let mut current = start.clone();
        let mut hops = 0;
        while let (Some(parent), _) = &by_id[&current] {
            current = parent.clone();
            hops += 1;
            assert!(hops <= by_id.len(), "cycle detected in lineage");
        }
    }
}

#[tokio::test]
async fn parent_must_be_known_and_live() {
    init_logs();
    let manager = ConversationManager::new(ScriptedExecutor::echo());

    let missing = ConversationId::from("conv_missing");
    let err = manager
        .create_conversation("t", "d", Some(&missing))
        .await
        .unwrap_err();
    assert!(matches!(err, C2cError::InvalidParent(_)));

    let root = manager.create_conversation("root", "d", None).await.unwrap();
    manager.end_conversation(&root).await.unwrap();
    let err = manager
        .create_conversation("t", "d", Some(&root))
        .await
        .unwrap_err();
    assert!(matches!(err, C2cError::InvalidParent(_)));
}

/// A session's backing execution calls back into the manager to spawn a
/// child conversation. The child is independent of its parent session.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn recursive_spawn_yields_independent_child() {
    init_logs();
    let slot: Arc<OnceLock<Arc<ConversationManager>>> = Arc::new(OnceLock::new());

    let responder_slot = Arc::clone(&slot);
    let executor = ScriptedExecutor::with(move |message: String| {
        let slot = Arc::clone(&responder_slot);
        async move {
            match message.strip_prefix("spawn-child:") {
                Some(parent) => {
                    let manager = slot.get().expect("manager installed before use");
                    let parent_id = ConversationId::from(parent);
                    let (child_conversation, child_session) = manager
                        .create_conversation_and_start_session(
                            "child",
                            "child task",
                            Some(&parent_id),
                        )
                        .await?;
                    Ok(format!("{child_conversation} {child_session}"))
                }
                None => Ok(format!("echo: {message}")),
            }
        }
    });

    let manager = Arc::new(ConversationManager::new(executor));
    slot.set(Arc::clone(&manager)).ok();

    let (parent_conversation, parent_session) = manager
        .create_conversation_and_start_session("parent", "parent task", None)
        .await
        .unwrap();

    // The agent turn itself performs the nested spawn.
    manager
        .send_message(&parent_session, &format!("spawn-child:{parent_conversation}"))
        .await
        .unwrap();
    let response = manager.receive_response(&parent_session).await.unwrap();
    let mut parts = response.split_whitespace();
    let child_conversation = ConversationId::from(parts.next().unwrap());
    let child_session = c2c::SessionId::from(parts.next().unwrap());

    let child = manager.get_conversation(&child_conversation).await.unwrap();
    assert_eq!(child.depth, 1);
    assert_eq!(child.parent_conversation_id, Some(parent_conversation.clone()));

    // Ending the parent session leaves the already-independent child running.
    manager.end_session(&parent_session).await.unwrap();

    let sessions = manager.list_sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, child_session);

    manager.send_message(&child_session, "ping").await.unwrap();
    assert_eq!(
        manager.receive_response(&child_session).await.unwrap(),
        "echo: ping"
    );

    let parent = manager.get_conversation(&parent_conversation).await.unwrap();
    assert_eq!(parent.status, ConversationStatus::Ended);
    let child = manager.get_conversation(&child_conversation).await.unwrap();
    assert_eq!(child.status, ConversationStatus::Active);
}
