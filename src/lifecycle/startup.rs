//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect the store and create the HTTP service before any transport
//! - Dispatch the configured connection kind and attach the strategy
//! - Start the HTTP listener last, once every route is registered
//!
//! # Design Decisions
//! - Fail fast: the first startup error aborts the sequence
//! - Steps run in order, never concurrently
//! - The registry lock is released between steps so a termination signal
//!   can take over what has been registered so far

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::http::{HttpService, StaticHandler};
use crate::lifecycle::dispatcher::{ConnectionDispatcher, DispatchError, Transport};
use crate::lifecycle::registry::{RegistryError, ServiceKey, ServiceRegistry};
use crate::net::ListenerError;
use crate::store::{StoreClient, StoreError};
use crate::strategies::{StrategyCatalog, StrategyDescriptor};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store connection failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("http listener failed to start: {0}")]
    Listen(#[from] ListenerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("'{0}' disappeared from the registry during startup")]
    Interrupted(ServiceKey),
}

/// Addresses and paths the process ended up serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedServices {
    pub http: SocketAddr,
    pub transport: Transport,
}

/// Run the startup sequence, populating `registry` as services come up.
pub async fn start(
    config: &ServerConfig,
    descriptor: &StrategyDescriptor,
    catalog: StrategyCatalog,
    registry: &Mutex<ServiceRegistry>,
) -> Result<StartedServices, StartupError> {
    tracing::info!(strategy = %descriptor.module_path(), "Starting services");

    let store = StoreClient::connect(&config.store).await?;
    registry.lock().await.set_store(store)?;

    registry
        .lock()
        .await
        .set_http(HttpService::new(config.host.clone(), config.port))?;

    let statics = StaticHandler::new(&config.static_root, descriptor);
    let dispatcher = ConnectionDispatcher::new(catalog, config.udp_endpoint());
    let transport = {
        let mut registry = registry.lock().await;
        dispatcher
            .dispatch(descriptor, &mut registry, &statics)
            .await?
    };

    let http = registry
        .lock()
        .await
        .http_mut()
        .ok_or(StartupError::Interrupted(ServiceKey::Http))?
        .listen()
        .await?;

    tracing::info!(http = %http, transport = ?transport, "Services started");
    Ok(StartedServices { http, transport })
}
