//! Shutdown orchestration.
//!
//! # Responsibilities
//! - One-shot `Running → ShuttingDown` transition on a termination signal
//! - Arm the forced-exit deadline at the instant the signal arrives
//! - Tear down populated services in the fixed order udp → ws → http → store
//! - Turn the result into an exit status
//!
//! # State Machine
//! ```text
//! Running ──signal──▶ ShuttingDown ──▶ exit 0 (all steps ok)
//!                          │         ──▶ exit 1 (any step failed)
//!                          └─deadline─▶ exit 1 (teardown still running)
//! ```
//!
//! # Design Decisions
//! - Steps run strictly one after another; each is awaited before the next
//! - A failed step is logged and the remaining steps still run
//! - Further signals while shutting down are ignored, never restarting the sequence

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::lifecycle::registry::{ServiceKey, ServiceRegistry, Services};
use crate::net::ListenerError;
use crate::observability::metrics;
use crate::store::StoreError;

/// Default bound on total shutdown latency.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(5000);

const RUNNING: u8 = 0;
const SHUTTING_DOWN: u8 = 1;

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("http listener failed to close: {0}")]
    Http(#[source] ListenerError),

    #[error("store failed to flush and close: {0}")]
    Store(#[source] StoreError),

    #[error("teardown task aborted: {0}")]
    Aborted(#[source] tokio::task::JoinError),
}

/// Lifecycle state of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShuttingDown,
}

/// How shutdown ended.
#[derive(Debug)]
pub enum ShutdownOutcome {
    /// Every populated step completed.
    Graceful,
    /// Teardown finished but at least one step failed.
    Failed(Vec<ShutdownError>),
    /// The deadline elapsed before teardown finished.
    DeadlineElapsed,
}

impl ShutdownOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownOutcome::Graceful => 0,
            ShutdownOutcome::Failed(_) | ShutdownOutcome::DeadlineElapsed => 1,
        }
    }
}

/// One entry of the teardown plan.
pub struct TeardownStep {
    key: ServiceKey,
    action: BoxFuture<'static, Result<(), ShutdownError>>,
}

impl TeardownStep {
    pub fn new<F>(key: ServiceKey, action: F) -> Self
    where
        F: Future<Output = Result<(), ShutdownError>> + Send + 'static,
    {
        Self {
            key,
            action: Box::pin(action),
        }
    }

    pub fn key(&self) -> ServiceKey {
        self.key
    }
}

/// Build the teardown plan from the registry, consuming it.
///
/// Unpopulated services produce no step.
pub fn teardown_plan(registry: ServiceRegistry) -> Vec<TeardownStep> {
    let Services {
        store,
        http,
        ws,
        udp,
    } = registry.into_services();

    [
        udp.map(|udp| {
            TeardownStep::new(ServiceKey::Udp, async move {
                udp.close().await;
                Ok(())
            })
        }),
        ws.map(|ws| {
            TeardownStep::new(ServiceKey::Ws, async move {
                ws.close().await;
                Ok(())
            })
        }),
        http.map(|http| {
            TeardownStep::new(ServiceKey::Http, async move {
                http.close().await.map_err(ShutdownError::Http)
            })
        }),
        store.map(|store| {
            TeardownStep::new(ServiceKey::Store, async move {
                store.close().await.map_err(ShutdownError::Store)
            })
        }),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Run the steps in order, awaiting each before starting the next.
///
/// Returns the errors of every failed step.
pub async fn run_teardown(steps: Vec<TeardownStep>) -> Vec<ShutdownError> {
    let mut errors = Vec::new();
    for step in steps {
        tracing::info!(service = %step.key, "Tearing down");
        match step.action.await {
            Ok(()) => metrics::record_teardown_step(step.key, true),
            Err(e) => {
                tracing::error!(service = %step.key, error = %e, "Teardown step failed");
                metrics::record_teardown_step(step.key, false);
                errors.push(e);
            }
        }
    }
    errors
}

/// Race `teardown` against `deadline`; whichever finishes first decides.
///
/// Teardown runs as its own task. The deadline timer is dropped as soon as
/// teardown completes, and teardown is aborted if the deadline wins.
pub async fn run_with_deadline<F>(teardown: F, deadline: Instant) -> ShutdownOutcome
where
    F: Future<Output = Vec<ShutdownError>> + Send + 'static,
{
    let mut task = tokio::spawn(teardown);
    let timer = tokio::time::sleep_until(deadline);

    tokio::select! {
        biased;
        joined = &mut task => match joined {
            Ok(errors) if errors.is_empty() => ShutdownOutcome::Graceful,
            Ok(errors) => ShutdownOutcome::Failed(errors),
            Err(e) => ShutdownOutcome::Failed(vec![ShutdownError::Aborted(e)]),
        },
        _ = timer => {
            task.abort();
            ShutdownOutcome::DeadlineElapsed
        }
    }
}

/// Owns the shutdown sequence for the process.
pub struct ShutdownOrchestrator {
    registry: Arc<Mutex<ServiceRegistry>>,
    deadline: Duration,
    state: AtomicU8,
}

impl ShutdownOrchestrator {
    pub fn new(registry: Arc<Mutex<ServiceRegistry>>, deadline: Duration) -> Self {
        Self {
            registry,
            deadline,
            state: AtomicU8::new(RUNNING),
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn state(&self) -> ShutdownState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => ShutdownState::Running,
            _ => ShutdownState::ShuttingDown,
        }
    }

    /// Handle a termination signal.
    ///
    /// The first call tears everything down and returns the outcome; any
    /// later call returns `None` immediately.
    pub async fn on_termination_signal(&self) -> Option<ShutdownOutcome> {
        let signalled_at = Instant::now();

        if self
            .state
            .compare_exchange(RUNNING, SHUTTING_DOWN, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Termination signal received while already shutting down; ignoring");
            return None;
        }

        tracing::info!(deadline_ms = self.deadline.as_millis() as u64, "Shutting down");

        let registry = Arc::clone(&self.registry);
        let teardown = async move {
            let registry = std::mem::take(&mut *registry.lock().await);
            run_teardown(teardown_plan(registry)).await
        };

        let outcome = run_with_deadline(teardown, signalled_at + self.deadline).await;
        match &outcome {
            ShutdownOutcome::Graceful => tracing::info!("Shutdown complete"),
            ShutdownOutcome::Failed(errors) => {
                tracing::error!(failed_steps = errors.len(), "Shutdown finished with errors")
            }
            ShutdownOutcome::DeadlineElapsed => tracing::error!(
                deadline_ms = self.deadline.as_millis() as u64,
                "Shutdown deadline elapsed; forcing exit"
            ),
        }
        Some(outcome)
    }
}
