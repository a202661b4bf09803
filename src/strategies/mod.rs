//! Strategy catalog.
//!
//! # Data Flow
//! ```text
//! (strategy, connection) from config
//!     → StrategyDescriptor (descriptor.rs)
//!     → StrategyCatalog::lookup
//!         EntryPoint(factory) → Strategy::attach(registry, static handler)
//!         NoEntryPoint        → nothing to wire
//!         missing             → startup-fatal
//! ```
//!
//! # Design Decisions
//! - Strategies are registered up front under `(name, kind)`; nothing is
//!   resolved from paths at runtime
//! - A strategy only wires handlers onto services already in the registry

pub mod counter;
pub mod descriptor;
pub mod echo;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::http::StaticHandler;
use crate::lifecycle::registry::{ServiceKey, ServiceRegistry};

pub use descriptor::{ConnectionKind, StrategyDescriptor, UnknownConnectionKind};

/// Errors a strategy may raise while attaching.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// A service the strategy wires onto is not registered.
    #[error("strategy requires the '{0}' service")]
    MissingService(ServiceKey),
}

/// Application logic for one connection kind.
pub trait Strategy: Send + Sync {
    /// Wire handlers onto the started services.
    fn attach(
        &self,
        registry: &mut ServiceRegistry,
        statics: &StaticHandler,
    ) -> Result<(), StrategyError>;
}

/// Builds a strategy instance.
pub type StrategyFactory = Arc<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

/// What the catalog holds for a `(name, kind)` pair.
#[derive(Clone)]
pub enum StrategyEntry {
    EntryPoint(StrategyFactory),
    /// Registered, but has nothing to attach.
    NoEntryPoint,
}

/// Registration-time lookup table of strategies.
#[derive(Clone, Default)]
pub struct StrategyCatalog {
    entries: HashMap<(String, ConnectionKind), StrategyEntry>,
}

impl StrategyCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of strategies shipped with the server.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog
            .register("echo", ConnectionKind::WebSocket, || {
                Box::new(echo::EchoWebSocket)
            })
            .register("echo", ConnectionKind::Udp, || Box::new(echo::EchoUdp))
            .register("counter", ConnectionKind::WebSocket, || {
                Box::new(counter::CounterWebSocket)
            })
            .register_without_entry_point("silent", ConnectionKind::WebSocket)
            .register_without_entry_point("silent", ConnectionKind::Udp);
        catalog
    }

    pub fn register<F>(&mut self, name: &str, kind: ConnectionKind, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Strategy> + Send + Sync + 'static,
    {
        self.entries.insert(
            (name.to_string(), kind),
            StrategyEntry::EntryPoint(Arc::new(factory)),
        );
        self
    }

    pub fn register_without_entry_point(&mut self, name: &str, kind: ConnectionKind) -> &mut Self {
        self.entries
            .insert((name.to_string(), kind), StrategyEntry::NoEntryPoint);
        self
    }

    pub fn lookup(&self, descriptor: &StrategyDescriptor) -> Option<&StrategyEntry> {
        self.entries
            .get(&(descriptor.strategy().to_string(), descriptor.connection()))
    }

    pub fn contains(&self, descriptor: &StrategyDescriptor) -> bool {
        self.lookup(descriptor).is_some()
    }

    /// Registered module paths, sorted.
    pub fn module_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .entries
            .keys()
            .map(|(name, kind)| StrategyDescriptor::new(name.clone(), *kind).module_path())
            .collect();
        paths.sort();
        paths
    }
}
