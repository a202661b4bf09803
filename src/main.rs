//! Strategy server
//!
//! Stands up a base HTTP listener plus one secondary transport (a WebSocket
//! layer or a UDP socket) and hands them to a pluggable strategy.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml + CLI ──▶ config ──▶ StrategyDescriptor
//!                                          │
//!                                          ▼
//!   ┌────────────────────────── lifecycle ──────────────────────────┐
//!   │  startup:  store ──▶ http ──▶ dispatcher (ws │ udp) ──▶ listen │
//!   │                         │                                      │
//!   │                         ▼                                      │
//!   │                  ServiceRegistry ◀── strategy.attach()         │
//!   │                         │                                      │
//!   │  shutdown: SIGINT/SIGTERM ──▶ udp ▶ ws ▶ http ▶ store ──▶ exit  │
//!   └────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;

use strategy_server::config::{resolve_components, Cli, ConfigSource};
use strategy_server::lifecycle::{
    signals, startup, ServiceRegistry, ShutdownOrchestrator, ShutdownOutcome, ShutdownState,
};
use strategy_server::observability::{logging, metrics};
use strategy_server::strategies::StrategyCatalog;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config, source) = cli.load()?;

    logging::init(&config.observability.log_level);

    tracing::info!("strategy-server v{} starting", env!("CARGO_PKG_VERSION"));
    if source == ConfigSource::Defaults {
        tracing::info!(path = %cli.config.display(), "Config file not found, using defaults");
    }
    tracing::info!(
        config = %cli.config.display(),
        host = %config.host,
        port = config.port,
        store = %config.store,
        deadline_ms = config.shutdown.deadline_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let descriptor = resolve_components(&config, &cli)?;
    let catalog = StrategyCatalog::builtin();
    tracing::info!(
        strategy = %descriptor,
        available = ?catalog.module_paths(),
        "Strategy selected"
    );

    let registry = Arc::new(Mutex::new(ServiceRegistry::new()));
    let orchestrator = Arc::new(ShutdownOrchestrator::new(
        Arc::clone(&registry),
        config.shutdown.deadline(),
    ));

    // Handlers go in before anything starts so an early signal still tears
    // down whatever was registered.
    let mut shutdown = signals::install(Arc::clone(&orchestrator))?;

    let startup = startup::start(&config, &descriptor, catalog, &registry);
    tokio::pin!(startup);

    tokio::select! {
        result = &mut startup => match result {
            Ok(started) => tracing::info!(
                http = %started.http,
                transport = ?started.transport,
                "Ready"
            ),
            Err(e) if orchestrator.state() == ShutdownState::ShuttingDown => {
                tracing::warn!(error = %e, "Startup interrupted by shutdown");
            }
            Err(e) => {
                tracing::error!(error = %e, "Startup failed");
                return Err(e.into());
            }
        },
        outcome = &mut shutdown => exit(outcome?),
    }

    exit(shutdown.await?)
}

fn exit(outcome: ShutdownOutcome) -> ! {
    let code = outcome.exit_code();
    tracing::info!(exit_code = code, "Exiting");
    std::process::exit(code)
}
