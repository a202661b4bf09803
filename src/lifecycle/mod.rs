//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Connect store → Create HTTP service → dispatcher.rs (transport + strategy)
//!     → HTTP listen
//!
//! Registry (registry.rs):
//!     store / http / ws / udp, each set once when its service starts
//!
//! Shutdown (shutdown.rs):
//!     Signal received → udp → ws → http → store → Exit
//!                     └── 5s deadline → Exit 1
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown (once)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: shared infrastructure first, listeners last
//! - Ordered shutdown, independent of startup order
//! - Shutdown has a deadline: forced exit after it elapses

pub mod dispatcher;
pub mod registry;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use dispatcher::{ConnectionDispatcher, DispatchError, Transport};
pub use registry::{RegistryError, ServiceKey, ServiceRegistry};
pub use shutdown::{ShutdownError, ShutdownOrchestrator, ShutdownOutcome, ShutdownState};
pub use startup::{StartedServices, StartupError};
