//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::shutdown::DEFAULT_DEADLINE;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listener host.
    pub host: String,

    /// HTTP listener port.
    pub port: u16,

    /// Store connection URL (`redis://…`, `rediss://…` or `memory://`).
    pub store: String,

    /// Directory holding one asset directory per strategy.
    pub static_root: PathBuf,

    /// UDP socket overrides; unset fields follow the HTTP listener.
    pub udp: Option<UdpConfig>,

    /// Strategy and connection kind. When a strategy is named here it takes
    /// precedence over command-line flags.
    pub components: Option<ComponentsConfig>,

    /// Shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            store: "redis://127.0.0.1:6379".to_string(),
            static_root: PathBuf::from("static"),
            udp: None,
            components: None,
            shutdown: ShutdownConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Where the UDP socket binds: configured values, else the HTTP host and
    /// HTTP port + 1. An ephemeral HTTP port (0) gives an ephemeral UDP port.
    pub fn udp_endpoint(&self) -> Endpoint {
        let udp = self.udp.as_ref();
        Endpoint {
            host: udp
                .and_then(|u| u.host.clone())
                .unwrap_or_else(|| self.host.clone()),
            // Port 65535 without an explicit UDP port is rejected by validation.
            port: udp
                .and_then(|u| u.port)
                .unwrap_or_else(|| match self.port {
                    0 => 0,
                    port => port.saturating_add(1),
                }),
        }
    }
}

/// A `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// UDP socket configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UdpConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Strategy selection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ComponentsConfig {
    pub strategy: Option<String>,
    pub connection: Option<String>,
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Forced-exit deadline in milliseconds, measured from signal receipt.
    pub deadline_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            deadline_ms: DEFAULT_DEADLINE.as_millis() as u64,
        }
    }
}

impl ShutdownConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
