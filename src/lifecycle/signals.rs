//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT/SIGTERM handlers at process start
//! - Forward the first signal to the shutdown orchestrator
//! - Keep listening during teardown so repeated signals are logged and ignored
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed before any service starts, so a signal during
//!   startup still tears down whatever has been registered

use std::io;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{ShutdownOrchestrator, ShutdownOutcome};

/// Registered termination signal streams.
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    /// Register the handlers. Must be called inside a Tokio runtime.
    pub fn new() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next termination signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => "SIGINT",
                _ = self.terminate.recv() => "SIGTERM",
            }
        }
        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Ctrl+C handler failed");
                std::future::pending::<()>().await;
            }
            "CTRL_C"
        }
    }
}

/// Install the signal handlers and spawn the task that drives shutdown.
///
/// The returned handle resolves with the outcome of the first shutdown.
pub fn install(orchestrator: Arc<ShutdownOrchestrator>) -> io::Result<JoinHandle<ShutdownOutcome>> {
    let mut signals = TerminationSignals::new()?;

    Ok(tokio::spawn(async move {
        let name = signals.recv().await;
        tracing::info!(signal = name, "Termination signal received");

        let shutdown = orchestrator.on_termination_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                outcome = &mut shutdown => match outcome {
                    Some(outcome) => return outcome,
                    // Another caller owns the teardown and will end the process.
                    None => std::future::pending::<()>().await,
                },
                name = signals.recv() => {
                    tracing::info!(signal = name, "Termination signal received");
                    orchestrator.on_termination_signal().await;
                }
            }
        }
    }))
}
