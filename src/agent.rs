//! Agent-execution capability boundary
//!
//! The manager never runs a model itself. It consumes an [`AgentExecutor`]
//! that can start a task and hand back an [`AgentHandle`] for posting
//! messages and collecting responses. Production deployments wrap an SDK
//! client here; tests plug in scripted doubles.
//!
//! Every failure crossing this boundary surfaces as
//! [`C2cError::AgentExecution`](crate::C2cError::AgentExecution): timeouts,
//! crashes, and malformed output are the capability's business, not the
//! session state machine's.

use futures::future::BoxFuture;

use crate::error::Result;

/// Factory for live agent executions
///
/// Implementations must be cheap to share (`Arc<dyn AgentExecutor>`) and safe
/// to call concurrently: every session start goes through the same executor.
pub trait AgentExecutor: Send + Sync + 'static {
    /// Start an agent working on `task_description` and return a handle to it
    fn start<'a>(&'a self, task_description: &'a str)
    -> BoxFuture<'a, Result<Box<dyn AgentHandle>>>;
}

/// A live agent execution bound to one session worker
///
/// The session worker has exclusive ownership, so methods take `&mut self`
/// and implementations need no internal locking.
pub trait AgentHandle: Send {
    /// Post one message to the agent without waiting for a reply
    fn post<'a>(&'a mut self, message: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Block until the agent's next response text is available
    fn next_response(&mut self) -> BoxFuture<'_, Result<String>>;

    /// Stop the execution and release its resources
    fn stop(&mut self) -> BoxFuture<'_, Result<()>>;
}
