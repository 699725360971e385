//! Shared test support: a scripted agent-execution capability
//!
//! Stands in for the wrapped SDK boundary. Each started handle answers the
//! last posted message through a caller-supplied responder closure, which is
//! enough to script echoes, latency, failures, and reentrant spawns.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;

use c2c::{AgentExecutor, AgentHandle, C2cError, Result};

type Responder =
    dyn Fn(String) -> BoxFuture<'static, Result<String>> + Send + Sync + 'static;

/// Scripted agent-execution capability for tests
pub struct ScriptedExecutor {
    responder: Arc<Responder>,
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
    fail_start: bool,
    start_delay: Duration,
}

impl ScriptedExecutor {
    /// Responder-driven executor
    pub fn with<F, Fut>(responder: F) -> Arc<Self>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Arc::new(Self {
            responder: Arc::new(move |message: String| -> BoxFuture<'static, Result<String>> {
                Box::pin(responder(message))
            }),
            started: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicUsize::new(0)),
            fail_start: false,
            start_delay: Duration::ZERO,
        })
    }

    /// Echoes every message back with an `echo: ` prefix
    pub fn echo() -> Arc<Self> {
        Self::with(|message| async move { Ok(format!("echo: {message}")) })
    }

    /// Echoes after a fixed delay, for isolation and cancellation tests
    pub fn delayed(delay: Duration) -> Arc<Self> {
        Self::with(move |message| async move {
            tokio::time::sleep(delay).await;
            Ok(format!("echo: {message}"))
        })
    }

    /// Takes a while to start each handle, for start/teardown race tests
    pub fn slow_start(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            responder: Arc::new(|message: String| -> BoxFuture<'static, Result<String>> {
                Box::pin(async move { Ok(format!("echo: {message}")) })
            }),
            started: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicUsize::new(0)),
            fail_start: false,
            start_delay: delay,
        })
    }

    /// Fails every `start` call, for composition-failure tests
    pub fn failing_start() -> Arc<Self> {
        Arc::new(Self {
            responder: Arc::new(|_: String| -> BoxFuture<'static, Result<String>> {
                Box::pin(async { Err(C2cError::agent("unreachable")) })
            }),
            started: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicUsize::new(0)),
            fail_start: true,
            start_delay: Duration::ZERO,
        })
    }

    /// How many handles were started
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// How many handles were stopped
    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl AgentExecutor for ScriptedExecutor {
    fn start<'a>(
        &'a self,
        _task_description: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn AgentHandle>>> {
        Box::pin(async move {
            if self.fail_start {
                return Err(C2cError::agent("agent backend unavailable"));
            }
            if !self.start_delay.is_zero() {
                tokio::time::sleep(self.start_delay).await;
            }
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedHandle {
                responder: Arc::clone(&self.responder),
                pending: None,
                stopped: Arc::clone(&self.stopped),
            }) as Box<dyn AgentHandle>)
        })
    }
}

struct ScriptedHandle {
    responder: Arc<Responder>,
    pending: Option<String>,
    stopped: Arc<AtomicUsize>,
}

impl AgentHandle for ScriptedHandle {
    fn post<'a>(&'a mut self, message: &'a str) -> BoxFuture<'a, Result<()>> {
        self.pending = Some(message.to_string());
        Box::pin(async { Ok(()) })
    }

    fn next_response(&mut self) -> BoxFuture<'_, Result<String>> {
        let pending = self.pending.take();
        let responder = Arc::clone(&self.responder);
        Box::pin(async move {
            match pending {
                Some(message) => (responder)(message).await,
                None => Err(C2cError::agent("no message posted")),
            }
        })
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<()>> {
        self.stopped.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// Initialize test logging once per binary
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}
