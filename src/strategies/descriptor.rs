//! Strategy descriptor and connection kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Secondary transport stood up next to the base HTTP listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// WebSocket upgrade layer on the HTTP listener.
    #[serde(alias = "ws")]
    WebSocket,
    /// Standalone UDP socket.
    Udp,
}

impl ConnectionKind {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::WebSocket => "websocket",
            ConnectionKind::Udp => "udp",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a connection kind string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown connection kind '{0}' (expected 'websocket' or 'udp')")]
pub struct UnknownConnectionKind(pub String);

impl FromStr for ConnectionKind {
    type Err = UnknownConnectionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "websocket" | "ws" => Ok(ConnectionKind::WebSocket),
            "udp" => Ok(ConnectionKind::Udp),
            _ => Err(UnknownConnectionKind(s.to_string())),
        }
    }
}

/// Resolved `(strategy, connection)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StrategyDescriptor {
    strategy: String,
    connection: ConnectionKind,
}

impl StrategyDescriptor {
    pub fn new(strategy: impl Into<String>, connection: ConnectionKind) -> Self {
        Self {
            strategy: strategy.into(),
            connection,
        }
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn connection(&self) -> ConnectionKind {
        self.connection
    }

    /// Catalog path of the strategy's service for this connection kind,
    /// e.g. `strategies/echo/services/udp`.
    pub fn module_path(&self) -> String {
        format!("strategies/{}/services/{}", self.strategy, self.connection)
    }

    /// Path the WebSocket upgrade layer is scoped to.
    pub fn ws_path(&self) -> String {
        format!("/{}", self.strategy)
    }
}

impl fmt::Display for StrategyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.strategy, self.connection)
    }
}
