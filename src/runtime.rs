//! Session runtime
//!
//! The live execution unit bound to one conversation. Each runtime owns a
//! background worker task that holds the agent handle, a mailbox for inbound
//! turns, and a result channel for outbound responses. The split between
//! `send` (fire-and-forget) and `receive` (blocks on this session's result
//! channel only) is what lets a parent dispatch to several child sessions
//! concurrently and collect results as they complete.
//!
//! State machine: `Starting -> Ready <-> Busy -> Ended`. At most one message
//! is in flight per runtime; a second `send` before `receive` is rejected,
//! which keeps turns strictly ordered within a session.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, mpsc, watch};

use crate::agent::{AgentExecutor, AgentHandle};
use crate::conversations::ConversationRegistry;
use crate::error::{C2cError, Result};
use crate::types::{
    ConversationId, ConversationStatus, Role, SessionId, SessionStatus, SessionSummary,
};

/// Turn handed to the background worker
enum TurnCommand {
    Turn {
        message: String,
    },
}

/// What the worker produced for one turn
enum TurnOutcome {
    /// The agent answered
    Response(String),
    /// The capability failed; the session stays usable for a retry
    Failed(String),
}

/// Live concurrent execution unit for one session
///
/// Shared as `Arc<SessionRuntime>` by the session registry. All methods take
/// `&self`. The status and last-activity fields sit behind synchronous locks
/// that are never held across an await, so status bookkeeping always runs to
/// completion even when the caller drops a `receive` future mid-wait. Only
/// the result channel uses an async lock, and only to suspend in `receive`.
#[derive(Debug)]
pub struct SessionRuntime {
    session_id: SessionId,
    conversation_id: ConversationId,
    conversations: Arc<ConversationRegistry>,
    status: SyncMutex<SessionStatus>,
    mailbox_tx: mpsc::UnboundedSender<TurnCommand>,
    result_rx: Mutex<mpsc::UnboundedReceiver<TurnOutcome>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    pending: AtomicUsize,
    last_activity: SyncMutex<DateTime<Utc>>,
}

impl SessionRuntime {
    /// Construct the runtime and its background worker
    ///
    /// Starts the agent on the conversation's task description, seeds the
    /// history with that initial user message, and leaves the runtime in
    /// `Ready`. Construction failures surface before anything is spawned, so
    /// a failed start never leaks a worker.
    pub(crate) async fn spawn(
        session_id: SessionId,
        conversation_id: ConversationId,
        conversations: Arc<ConversationRegistry>,
        executor: &dyn AgentExecutor,
    ) -> Result<Self> {
        let snapshot = conversations.get(&conversation_id).await?;
        let handle = executor.start(&snapshot.task_description).await?;

        // The initial task is the first user entry, matching what the agent
        // was actually given.
        conversations
            .append_history(&conversation_id, Role::User, &snapshot.task_description)
            .await?;

        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = Worker {
            session_id: session_id.clone(),
            conversation_id: conversation_id.clone(),
            conversations: Arc::clone(&conversations),
            handle,
            mailbox_rx,
            result_tx,
            shutdown_rx: shutdown_rx.clone(),
        };
        tokio::spawn(worker.run());

        log::debug!("Session {} ready for conversation {}", session_id, conversation_id);

        Ok(Self {
            session_id,
            conversation_id,
            conversations,
            status: SyncMutex::new(SessionStatus::Ready),
            mailbox_tx,
            result_rx: Mutex::new(result_rx),
            shutdown_tx,
            shutdown_rx,
            pending: AtomicUsize::new(0),
            last_activity: SyncMutex::new(Utc::now()),
        })
    }

    fn status_lock(&self) -> MutexGuard<'_, SessionStatus> {
        // A poisoning panic can only come from a test assertion; the guarded
        // state is a plain enum and stays coherent.
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Utc::now();
    }

    /// Session identifier
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Conversation this runtime is bound to
    #[must_use]
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Accept one message for processing and return immediately
    ///
    /// Valid only in `Ready`; flips the session to `Busy` and hands the turn
    /// to the background worker without waiting for the agent. The caller
    /// must `receive` the response before sending again.
    pub async fn send(&self, message: &str) -> Result<()> {
        // Reserve the turn before the history append so a concurrent send
        // cannot pass the Ready check in between; released if the append
        // fails.
        {
            let mut status = self.status_lock();
            match *status {
                SessionStatus::Ready => {}
                SessionStatus::Busy => {
                    return Err(C2cError::not_ready(
                        self.session_id.clone(),
                        "a message is already in flight; receive the response first",
                    ));
                }
                SessionStatus::Starting => {
                    return Err(C2cError::not_ready(
                        self.session_id.clone(),
                        "session is still starting",
                    ));
                }
                SessionStatus::Ended => {
                    return Err(C2cError::SessionEnded(self.session_id.clone()));
                }
            }
            *status = SessionStatus::Busy;
        }

        if let Err(e) = self
            .conversations
            .append_history(&self.conversation_id, Role::User, message)
            .await
        {
            let mut status = self.status_lock();
            if *status == SessionStatus::Busy {
                *status = SessionStatus::Ready;
            }
            return Err(e);
        }

        self.mailbox_tx
            .send(TurnCommand::Turn {
                message: message.to_string(),
            })
            .map_err(|_| C2cError::SessionEnded(self.session_id.clone()))?;

        self.pending.fetch_add(1, Ordering::SeqCst);
        self.touch();
        Ok(())
    }

    /// Wait for the in-flight turn's response
    ///
    /// Suspends on this session's result channel only; unrelated sessions
    /// make progress. On success the session returns to `Ready`. A capability
    /// failure surfaces as `AgentExecution` and also returns the session to
    /// `Ready`, so one failed turn never poisons the session. Ending the
    /// session while a wait is pending fails it with `SessionEnded`.
    pub async fn receive(&self) -> Result<String> {
        let mut result_rx = self.result_rx.lock().await;

        // Checked after taking the channel lock: a concurrent receive that
        // consumed the outcome has already flipped the status back to Ready.
        {
            let status = self.status_lock();
            match *status {
                SessionStatus::Busy => {}
                SessionStatus::Ended => {
                    return Err(C2cError::SessionEnded(self.session_id.clone()));
                }
                _ => {
                    return Err(C2cError::not_ready(
                        self.session_id.clone(),
                        "no message in flight",
                    ));
                }
            }
        }

        let mut shutdown_rx = self.shutdown_rx.clone();
        let outcome = tokio::select! {
            _ = shutdown_signalled(&mut shutdown_rx) => None,
            outcome = result_rx.recv() => outcome,
        };

        // Everything from here runs without an await: once the outcome is
        // consumed the bookkeeping cannot be abandoned by a caller dropping
        // this future (e.g. under a caller-side timeout). A drop during the
        // select above loses nothing — recv is cancel-safe and the outcome
        // stays in the channel for the next receive. The channel lock is
        // held until the flip, so a concurrent receive cannot slip past the
        // Busy check and wait on a channel that will never yield.
        let mut status = self.status_lock();
        match outcome {
            None => {
                *status = SessionStatus::Ended;
                Err(C2cError::SessionEnded(self.session_id.clone()))
            }
            Some(TurnOutcome::Response(text)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                if *status != SessionStatus::Ended {
                    *status = SessionStatus::Ready;
                }
                drop(status);
                self.touch();
                Ok(text)
            }
            Some(TurnOutcome::Failed(message)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                if *status != SessionStatus::Ended {
                    *status = SessionStatus::Ready;
                }
                drop(status);
                self.touch();
                Err(C2cError::AgentExecution(message))
            }
        }
    }

    /// Tear the session down
    ///
    /// Idempotent. Cancels any pending `receive` with `SessionEnded`,
    /// releases the worker (which stops the agent handle best-effort), and
    /// marks the bound conversation ended. The accumulated history has
    /// already been appended to the conversation turn by turn.
    pub async fn end(&self) -> Result<()> {
        {
            let mut status = self.status_lock();
            if *status == SessionStatus::Ended {
                return Ok(());
            }
            *status = SessionStatus::Ended;
        }

        let _ = self.shutdown_tx.send(true);

        // The conversation outlives the session; only its status changes.
        if let Err(e) = self
            .conversations
            .set_status(&self.conversation_id, ConversationStatus::Ended)
            .await
        {
            log::warn!(
                "Failed to mark conversation {} ended during session teardown: {}",
                self.conversation_id,
                e
            );
        }

        log::debug!("Session {} ended", self.session_id);
        Ok(())
    }

    /// Point-in-time summary for `list_sessions`
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            conversation_id: self.conversation_id.clone(),
            status: *self.status_lock(),
            pending_messages: self.pending.load(Ordering::SeqCst),
            last_activity: *self
                .last_activity
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Resolves once teardown is signalled (or the runtime itself is gone)
async fn shutdown_signalled(rx: &mut watch::Receiver<bool>) {
    // wait_for checks the current value first, so a signal sent before this
    // call is never missed; a closed channel also counts as shutdown.
    let _ = rx.wait_for(|stop| *stop).await;
}

// ============================================================================
// BACKGROUND WORKER
// ============================================================================

/// Background task owning the agent handle for one session
///
/// Processes turns one at a time from the mailbox. The handle never leaves
/// this task, so no lock guards it and a slow agent turn can only ever stall
/// its own session.
struct Worker {
    session_id: SessionId,
    conversation_id: ConversationId,
    conversations: Arc<ConversationRegistry>,
    handle: Box<dyn AgentHandle>,
    mailbox_rx: mpsc::UnboundedReceiver<TurnCommand>,
    result_tx: mpsc::UnboundedSender<TurnOutcome>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let message = tokio::select! {
                _ = shutdown_signalled(&mut self.shutdown_rx) => break,
                cmd = self.mailbox_rx.recv() => match cmd {
                    Some(TurnCommand::Turn { message }) => message,
                    // All senders dropped: the runtime is gone.
                    None => break,
                },
            };

            let mut shutdown_rx = self.shutdown_rx.clone();
            let outcome = tokio::select! {
                // Teardown mid-turn: discard the in-flight result. The
                // pending receive is failed by the runtime's own shutdown
                // signal.
                _ = shutdown_signalled(&mut shutdown_rx) => break,
                outcome = run_turn(self.handle.as_mut(), &message) => outcome,
            };

            match outcome {
                Ok(text) => {
                    if let Err(e) = self
                        .conversations
                        .append_history(&self.conversation_id, Role::Assistant, &text)
                        .await
                    {
                        log::warn!(
                            "[{}] Failed to append assistant response to history: {}",
                            self.session_id,
                            e
                        );
                    }
                    let _ = self.result_tx.send(TurnOutcome::Response(text));
                }
                Err(e) => {
                    log::warn!("[{}] Agent turn failed: {}", self.session_id, e);
                    // Avoid double-wrapping when the capability already
                    // reported an execution error.
                    let message = match e {
                        C2cError::AgentExecution(m) => m,
                        other => other.to_string(),
                    };
                    let _ = self.result_tx.send(TurnOutcome::Failed(message));
                }
            }
        }

        // Best-effort release; the session is being discarded regardless.
        if let Err(e) = self.handle.stop().await {
            log::warn!("[{}] Agent stop failed during teardown: {}", self.session_id, e);
        }
    }
}

async fn run_turn(handle: &mut dyn AgentHandle, message: &str) -> Result<String> {
    handle.post(message).await?;
    handle.next_response().await
}
