//! Strategy server library

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod store;
pub mod strategies;

pub use config::ServerConfig;
pub use lifecycle::{ServiceRegistry, ShutdownOrchestrator};
pub use strategies::{StrategyCatalog, StrategyDescriptor};
