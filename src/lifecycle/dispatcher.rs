//! Connection dispatch.
//!
//! # Responsibilities
//! - Resolve the strategy before touching any transport
//! - Stand up the single transport named by the connection kind
//! - Hand the registry and static handler to the strategy's entry point
//!
//! # Design Decisions
//! - Exactly one connection kind per process
//! - Every error here is startup-fatal; nothing is retried

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::Endpoint;
use crate::http::{StaticHandler, WsLayer};
use crate::lifecycle::registry::{RegistryError, ServiceKey, ServiceRegistry};
use crate::net::{ListenerError, UdpService};
use crate::strategies::{
    ConnectionKind, StrategyCatalog, StrategyDescriptor, StrategyEntry, StrategyError,
};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no strategy registered at '{module_path}'")]
    UnknownStrategy { module_path: String },

    #[error("'{0}' must be started before dispatching a connection")]
    MissingService(ServiceKey),

    #[error("failed to bind udp socket: {0}")]
    Bind(#[source] ListenerError),

    #[error("strategy '{module_path}' failed to attach: {source}")]
    Strategy {
        module_path: String,
        #[source]
        source: StrategyError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// What the dispatcher stood up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    WebSocket { path: String },
    Udp { address: SocketAddr },
}

/// Starts the connection-kind transport and attaches the strategy.
pub struct ConnectionDispatcher {
    catalog: StrategyCatalog,
    udp: Endpoint,
}

impl ConnectionDispatcher {
    /// `udp` is where the socket binds for UDP strategies.
    pub fn new(catalog: StrategyCatalog, udp: Endpoint) -> Self {
        Self { catalog, udp }
    }

    pub async fn dispatch(
        &self,
        descriptor: &StrategyDescriptor,
        registry: &mut ServiceRegistry,
        statics: &StaticHandler,
    ) -> Result<Transport, DispatchError> {
        let module_path = descriptor.module_path();
        let entry = self
            .catalog
            .lookup(descriptor)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownStrategy {
                module_path: module_path.clone(),
            })?;

        for key in [ServiceKey::Store, ServiceKey::Http] {
            if !registry.is_populated(key) {
                return Err(DispatchError::MissingService(key));
            }
        }

        let transport = match descriptor.connection() {
            ConnectionKind::WebSocket => {
                let path = descriptor.ws_path();
                let http = registry
                    .http_mut()
                    .ok_or(DispatchError::MissingService(ServiceKey::Http))?;
                let layer = WsLayer::attach(http, path.clone());
                registry.set_ws(layer)?;
                Transport::WebSocket { path }
            }
            ConnectionKind::Udp => {
                let udp = UdpService::bind(&self.udp.host, self.udp.port)
                    .await
                    .map_err(DispatchError::Bind)?;
                let address = udp.local_addr();
                registry.set_udp(udp)?;
                Transport::Udp { address }
            }
        };

        match entry {
            StrategyEntry::EntryPoint(factory) => {
                factory()
                    .attach(registry, statics)
                    .map_err(|source| DispatchError::Strategy {
                        module_path: module_path.clone(),
                        source,
                    })?;
                tracing::info!(strategy = %module_path, "Strategy attached");
            }
            StrategyEntry::NoEntryPoint => {
                tracing::info!(strategy = %module_path, "Strategy has no entry point");
            }
        }

        Ok(transport)
    }
}
