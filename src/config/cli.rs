//! Command-line arguments and component resolution.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_or_default, ConfigError, ConfigSource};
use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, validate_strategy_name};
use crate::strategies::{ConnectionKind, StrategyDescriptor};

pub const DEFAULT_STRATEGY: &str = "echo";
pub const DEFAULT_CONNECTION: ConnectionKind = ConnectionKind::WebSocket;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "strategy-server", version, about = "Pluggable strategy server")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Strategy name, used when the config file names none
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Connection kind (websocket or udp), used when the config file names no strategy
    #[arg(long)]
    pub connection: Option<String>,

    /// HTTP host, overrides the config file
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP port, overrides the config file
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Cli {
    /// Load `--config` (or the defaults when it is missing), apply the
    /// overrides, then validate the result once.
    pub fn load(&self) -> Result<(ServerConfig, ConfigSource), ConfigError> {
        let (mut config, source) = load_or_default(&self.config)?;
        self.apply_overrides(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok((config, source))
    }

    /// Apply `--host` / `--port` on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
    }
}

/// Decide which strategy and connection kind to run.
///
/// A `[components]` table naming a strategy wins outright, including its
/// connection (default `websocket`). Otherwise the CLI flags apply, then the
/// built-in defaults.
pub fn resolve_components(config: &ServerConfig, cli: &Cli) -> Result<StrategyDescriptor, ConfigError> {
    let from_file = config
        .components
        .as_ref()
        .and_then(|c| c.strategy.clone().map(|s| (s, c.connection.clone())));

    let (strategy, connection) = match from_file {
        Some(pair) => pair,
        None => (
            cli.strategy.clone().unwrap_or_else(|| DEFAULT_STRATEGY.to_string()),
            cli.connection.clone(),
        ),
    };

    validate_strategy_name(&strategy).map_err(|e| ConfigError::Components(e.to_string()))?;

    let connection = match connection {
        Some(raw) => raw
            .parse::<ConnectionKind>()
            .map_err(|e| ConfigError::Components(e.to_string()))?,
        None => DEFAULT_CONNECTION,
    };

    Ok(StrategyDescriptor::new(strategy, connection))
}
